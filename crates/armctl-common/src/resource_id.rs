//! Resource identifier parsing
//!
//! Control-plane identifiers are path-like strings of alternating
//! keyword/value segments:
//!
//! ```text
//! /subscriptions/<sub>/resourceGroups/<rg>/providers/<namespace>/<collection>/<name>[/<child>/<name>...]
//! ```
//!
//! Keywords are matched case-insensitively; values keep their case.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";

/// Identifier parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    /// The identifier does not follow the expected segmentation
    #[error("malformed resource identifier '{id}': {reason}")]
    MalformedIdentifier { id: String, reason: &'static str },
}

impl ResourceIdError {
    fn malformed(id: &str, reason: &'static str) -> Self {
        ResourceIdError::MalformedIdentifier {
            id: id.to_string(),
            reason,
        }
    }
}

/// Parsed components of a control-plane resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Subscription the resource is billed to
    pub subscription_id: String,
    /// Resource group containing the resource
    pub resource_group: String,
    /// Provider namespace (e.g. `Microsoft.Sql`)
    pub provider: String,
    /// Collection/name pairs below the provider, outermost first
    pub path: Vec<(String, String)>,
}

impl ResourceId {
    /// Parse a provider-issued identifier.
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let trimmed = id.trim_matches('/');
        if trimmed.is_empty() {
            return Err(ResourceIdError::malformed(id, "identifier is empty"));
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.len() % 2 != 0 {
            return Err(ResourceIdError::malformed(
                id,
                "segments do not form key/value pairs",
            ));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        for pair in segments.chunks_exact(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(ResourceIdError::malformed(id, "empty path segment"));
            }

            if key.eq_ignore_ascii_case(SUBSCRIPTIONS) && subscription_id.is_none() {
                subscription_id = Some(value);
            } else if key.eq_ignore_ascii_case(RESOURCE_GROUPS) && resource_group.is_none() {
                resource_group = Some(value);
            } else if key.eq_ignore_ascii_case(PROVIDERS) && provider.is_none() {
                provider = Some(value);
            } else if provider.is_some() {
                path.push((key.to_string(), value.to_string()));
            } else {
                return Err(ResourceIdError::malformed(
                    id,
                    "unexpected segment before provider namespace",
                ));
            }
        }

        let subscription_id = subscription_id
            .ok_or_else(|| ResourceIdError::malformed(id, "missing subscriptions segment"))?;
        let resource_group = resource_group
            .ok_or_else(|| ResourceIdError::malformed(id, "missing resourceGroups segment"))?;
        let provider =
            provider.ok_or_else(|| ResourceIdError::malformed(id, "missing providers segment"))?;
        if path.is_empty() {
            return Err(ResourceIdError::malformed(
                id,
                "no collection/name after provider namespace",
            ));
        }

        Ok(Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            provider: provider.to_string(),
            path,
        })
    }

    /// Innermost collection name (e.g. `servers`)
    pub fn collection(&self) -> &str {
        // parse() guarantees a non-empty path
        self.path.last().map(|(k, _)| k.as_str()).unwrap_or_default()
    }

    /// Innermost resource name
    pub fn name(&self) -> &str {
        self.path.last().map(|(_, v)| v.as_str()).unwrap_or_default()
    }

    /// Look up the name stored under a collection keyword, case-insensitively.
    pub fn path_value(&self, collection: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(collection))
            .map(|(_, v)| v.as_str())
    }

    /// Build an identifier for a top-level resource.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
        collection: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: provider.into(),
            path: vec![(collection.into(), name.into())],
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{SUBSCRIPTIONS}/{}/{RESOURCE_GROUPS}/{}/{PROVIDERS}/{}",
            self.subscription_id, self.resource_group, self.provider
        )?;
        for (key, value) in &self.path {
            write!(f, "/{key}/{value}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
