//! Control-plane error classification and handling
//!
//! Provides typed errors for SQL server operations using the HTTP status and
//! the ARM error `code` instead of string matching on Debug output.

use thiserror::Error;

/// Control-plane error categories for assertion and sweep logic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArmError {
    /// Resource was not found (success for destroy checks and deletes)
    #[error("Resource not found: {resource_type} '{resource_id}'")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Conflicting operation already in progress on the resource
    #[error("Conflicting operation in progress: {message}")]
    Conflict { message: String },

    /// Credentials rejected or missing permissions
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Operation was cancelled before it reached the control plane
    #[error("Operation cancelled")]
    Cancelled,

    /// Any other transport or service failure
    #[error("Control plane error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
}

impl ArmError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::NotFound { .. })
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, ArmError::Throttled | ArmError::Conflict { .. })
            || matches!(self, ArmError::Transport { status: Some(s), .. } if *s >= 500)
    }

    /// Build a not-found error for a named resource.
    pub fn not_found(resource_type: &'static str, resource_id: impl Into<String>) -> Self {
        ArmError::NotFound {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    /// Build a transport error without a status (connection reset, timeout).
    pub fn transport(message: impl Into<String>) -> Self {
        ArmError::Transport {
            status: None,
            code: None,
            message: message.into(),
        }
    }
}

/// Known ARM error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "ParentResourceNotFound",
    "NotFound",
];

/// Known ARM error codes for throttling
const THROTTLING_CODES: &[&str] = &["TooManyRequests", "SubscriptionRequestsThrottled"];

/// Known ARM error codes for conflicting operations
const CONFLICT_CODES: &[&str] = &["Conflict", "AnotherOperationInProgress", "OperationInProgress"];

/// Known ARM error codes for authorization failures
const AUTH_CODES: &[&str] = &[
    "AuthorizationFailed",
    "AuthenticationFailed",
    "InvalidAuthenticationToken",
    "ExpiredAuthenticationToken",
];

/// Classify a control-plane failure from its HTTP status and ARM error code.
///
/// The error code wins over the status: a 404 carrying an unexpected code is
/// still reported as not found, but a known code always decides the variant.
pub fn classify_arm_error(status: Option<u16>, code: Option<&str>, message: Option<&str>) -> ArmError {
    let message = message.unwrap_or("Unknown error").to_string();

    match (status, code) {
        (_, Some(c)) if NOT_FOUND_CODES.contains(&c) => ArmError::NotFound {
            resource_type: "resource",
            resource_id: message,
        },
        (_, Some(c)) if THROTTLING_CODES.contains(&c) => ArmError::Throttled,
        (_, Some(c)) if CONFLICT_CODES.contains(&c) => ArmError::Conflict { message },
        (_, Some(c)) if AUTH_CODES.contains(&c) => ArmError::Unauthorized { message },
        (Some(404), _) => ArmError::NotFound {
            resource_type: "resource",
            resource_id: message,
        },
        (Some(429), _) => ArmError::Throttled,
        (Some(409), _) => ArmError::Conflict { message },
        (Some(401 | 403), _) => ArmError::Unauthorized { message },
        _ => ArmError::Transport {
            status,
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Treat "not found" as success, propagating every other error.
pub fn ignore_not_found<T>(result: Result<T, ArmError>) -> Result<Option<T>, ArmError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
