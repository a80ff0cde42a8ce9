//! Lifecycle assertions for declared SQL servers
//!
//! The controller observes the `Absent -> Present -> Present' -> Absent`
//! transitions a scenario drives through apply steps. It only ever mutates
//! remote state through [`LifecycleController::force_delete`], which removes
//! a server out-of-band so a scenario can verify the drift is detected.
//!
//! Every call re-reads the control plane; nothing is cached between calls.

use crate::arm::{ArmError, ResourceRef, ServerSnapshot, SqlServerOperations, ignore_not_found};
use crate::wait::{WaitConfig, WaitError, poll_until};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle check failures. Every variant names the resource involved.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The server is expected to exist but the control plane reports it absent
    #[error("SQL server {name} (resource group: {resource_group}) does not exist")]
    NotFound {
        resource_group: String,
        name: String,
    },

    /// The server is expected to be gone but is still visible
    #[error("SQL server {name} (resource group: {resource_group}) still exists")]
    StillExists {
        resource_group: String,
        name: String,
    },

    /// A live attribute differs from the expected value
    #[error(
        "SQL server {name} (resource group: {resource_group}): attribute '{attribute}' expected '{expected}', got '{actual}'"
    )]
    AttributeMismatch {
        resource_group: String,
        name: String,
        attribute: String,
        expected: String,
        actual: String,
    },

    /// The server was still visible when the wait deadline passed
    #[error(
        "SQL server {name} (resource group: {resource_group}) still exists after {elapsed:?} ({checks} checks)"
    )]
    Timeout {
        resource_group: String,
        name: String,
        checks: u32,
        elapsed: Duration,
    },

    /// The wait was cancelled before the server disappeared
    #[error("Wait for SQL server {name} (resource group: {resource_group}) to be destroyed was cancelled")]
    Cancelled {
        resource_group: String,
        name: String,
    },

    /// Any control-plane failure other than "not found"
    #[error("{operation} on SQL server {name} (resource group: {resource_group}) failed")]
    Transport {
        operation: &'static str,
        resource_group: String,
        name: String,
        #[source]
        source: ArmError,
    },
}

impl LifecycleError {
    fn not_found(target: &ResourceRef) -> Self {
        LifecycleError::NotFound {
            resource_group: target.resource_group.clone(),
            name: target.name.clone(),
        }
    }

    fn still_exists(target: &ResourceRef) -> Self {
        LifecycleError::StillExists {
            resource_group: target.resource_group.clone(),
            name: target.name.clone(),
        }
    }

    fn transport(operation: &'static str, target: &ResourceRef, source: ArmError) -> Self {
        LifecycleError::Transport {
            operation,
            resource_group: target.resource_group.clone(),
            name: target.name.clone(),
            source,
        }
    }

    fn mismatch(
        target: &ResourceRef,
        attribute: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        LifecycleError::AttributeMismatch {
            resource_group: target.resource_group.clone(),
            name: target.name.clone(),
            attribute: attribute.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LifecycleError::NotFound { .. })
    }

    pub fn is_still_exists(&self) -> bool {
        matches!(self, LifecycleError::StillExists { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, LifecycleError::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LifecycleError::Cancelled { .. })
    }
}

/// Verification and forced-deletion primitives over declared servers
pub struct LifecycleController<C> {
    client: C,
}

impl<C: SqlServerOperations> LifecycleController<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Whether the server is currently present.
    ///
    /// Absence is `Ok(false)`. Every other failure is an error: an outage
    /// must never read as "does not exist".
    pub async fn exists(&self, target: &ResourceRef) -> Result<bool, LifecycleError> {
        ignore_not_found(self.client.get(&target.resource_group, &target.name).await)
            .map(|snapshot| snapshot.is_some())
            .map_err(|e| LifecycleError::transport("Get", target, e))
    }

    /// Fetch a fresh snapshot of the server.
    pub async fn read(&self, target: &ResourceRef) -> Result<ServerSnapshot, LifecycleError> {
        match self.client.get(&target.resource_group, &target.name).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.is_not_found() => Err(LifecycleError::not_found(target)),
            Err(e) => Err(LifecycleError::transport("Get", target, e)),
        }
    }

    /// Succeed iff the server is present.
    pub async fn assert_exists(&self, target: &ResourceRef) -> Result<(), LifecycleError> {
        if self.exists(target).await? {
            debug!(resource_group = %target.resource_group, name = %target.name, "SQL server exists");
            Ok(())
        } else {
            Err(LifecycleError::not_found(target))
        }
    }

    /// Succeed iff the control plane reports the server absent.
    pub async fn assert_destroyed(&self, target: &ResourceRef) -> Result<(), LifecycleError> {
        if self.exists(target).await? {
            Err(LifecycleError::still_exists(target))
        } else {
            debug!(resource_group = %target.resource_group, name = %target.name, "SQL server destroyed");
            Ok(())
        }
    }

    /// Check every declared server is gone, stopping at the first survivor.
    pub async fn assert_all_destroyed(&self, targets: &[ResourceRef]) -> Result<(), LifecycleError> {
        for target in targets {
            self.assert_destroyed(target).await?;
        }
        Ok(())
    }

    /// Check the live server carries exactly `expected` tags.
    pub async fn assert_tag_count(
        &self,
        target: &ResourceRef,
        expected: usize,
    ) -> Result<(), LifecycleError> {
        let snapshot = self.read(target).await?;
        if snapshot.tag_count() == expected {
            Ok(())
        } else {
            Err(LifecycleError::mismatch(
                target,
                "tags.%",
                expected,
                snapshot.tag_count(),
            ))
        }
    }

    /// Check one live tag value.
    pub async fn assert_tag(
        &self,
        target: &ResourceRef,
        key: &str,
        expected: &str,
    ) -> Result<(), LifecycleError> {
        let snapshot = self.read(target).await?;
        match snapshot.tags.get(key) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(LifecycleError::mismatch(
                target,
                format!("tags.{key}"),
                expected,
                actual,
            )),
            None => Err(LifecycleError::mismatch(
                target,
                format!("tags.{key}"),
                expected,
                "<unset>",
            )),
        }
    }

    /// Delete the server out-of-band and wait for the result.
    ///
    /// The token passed to the client is never cancelled. A "not found"
    /// result counts as success: the server is already gone.
    pub async fn force_delete(&self, target: &ResourceRef) -> Result<(), LifecycleError> {
        info!(
            resource_group = %target.resource_group,
            name = %target.name,
            "Force-deleting SQL server"
        );

        let handle = self
            .client
            .delete(&target.resource_group, &target.name, CancellationToken::new());

        match handle.wait().await.into_result() {
            Ok(response) => {
                info!(
                    resource_group = %target.resource_group,
                    name = %target.name,
                    status = response.status,
                    "Deleted SQL server"
                );
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    resource_group = %target.resource_group,
                    name = %target.name,
                    "SQL server already deleted"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    resource_group = %target.resource_group,
                    name = %target.name,
                    error = %e,
                    "Delete failed"
                );
                Err(LifecycleError::transport("Delete", target, e))
            }
        }
    }

    /// Poll until the server is reported absent.
    ///
    /// Rides out reads that still see a deleted server. A transport failure
    /// ends the wait immediately and is returned as-is.
    pub async fn wait_until_destroyed(
        &self,
        target: &ResourceRef,
        config: &WaitConfig,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), LifecycleError> {
        let outcome = poll_until(config, cancel, || async {
            self.exists(target).await.map(|present| !present)
        })
        .await;

        match outcome {
            Ok(checks) => {
                debug!(
                    resource_group = %target.resource_group,
                    name = %target.name,
                    checks,
                    "SQL server destroyed"
                );
                Ok(())
            }
            Err(WaitError::Check(err)) => Err(err),
            Err(WaitError::TimedOut { checks, elapsed }) => {
                warn!(
                    resource_group = %target.resource_group,
                    name = %target.name,
                    checks,
                    "SQL server still visible at deadline"
                );
                Err(LifecycleError::Timeout {
                    resource_group: target.resource_group.clone(),
                    name: target.name.clone(),
                    checks,
                    elapsed,
                })
            }
            Err(WaitError::Cancelled { .. }) => Err(LifecycleError::Cancelled {
                resource_group: target.resource_group.clone(),
                name: target.name.clone(),
            }),
        }
    }
}
