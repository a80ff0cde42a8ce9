//! Control-plane client contract for SQL servers
//!
//! This module provides:
//! - `client`: the `SqlServerOperations` trait and the async `DeletionHandle`
//! - `error`: `ArmError` and classification of status/code pairs
//! - `types`: declared resources, snapshots and delete responses

pub mod client;
pub mod error;
pub mod types;

pub use client::{DeletionHandle, DeletionOutcome, DeletionSender, SqlServerOperations};
pub use error::{ArmError, classify_arm_error, ignore_not_found};
pub use types::{DeclaredResource, DeleteResponse, ResourceRef, ServerProperties, ServerSnapshot};

#[cfg(test)]
pub use client::MockSqlServerOperations;
