//! SQL server data model: declared desired state and live snapshots

use armctl_common::defaults::{DEFAULT_ADMIN_LOGIN, DEFAULT_SQL_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reference to a declared resource: enough to look it up remotely
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_group: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(resource_group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (resource group: {})", self.name, self.resource_group)
    }
}

/// Desired state of a SQL server, as produced by the scenario driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredResource {
    pub resource_group: String,
    pub name: String,
    pub location: String,
    pub version: String,
    pub administrator_login: String,
    #[serde(skip_serializing, default)]
    pub administrator_login_password: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl DeclaredResource {
    /// Declare a server with the default version and admin login.
    pub fn new(
        resource_group: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            name: name.into(),
            location: location.into(),
            version: DEFAULT_SQL_VERSION.to_string(),
            administrator_login: DEFAULT_ADMIN_LOGIN.to_string(),
            administrator_login_password: String::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.administrator_login_password = password.into();
        self
    }

    /// Replace the tag set. Duplicate keys keep the last value.
    pub fn with_tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// The reference the lifecycle controller resolves against.
    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(&self.resource_group, &self.name)
    }
}

/// Server-side properties reported by the control plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub administrator_login: Option<String>,
    #[serde(default)]
    pub fully_qualified_domain_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Provider's current view of a SQL server. Never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: ServerProperties,
}

impl ServerSnapshot {
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

/// Final HTTP-level outcome of an asynchronous delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResponse {
    pub status: u16,
}

impl DeleteResponse {
    pub const OK: DeleteResponse = DeleteResponse { status: 200 };
    pub const NO_CONTENT: DeleteResponse = DeleteResponse { status: 204 };
    pub const NOT_FOUND: DeleteResponse = DeleteResponse { status: 404 };

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}
