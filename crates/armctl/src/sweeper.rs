//! Name/region-scoped cleanup of leaked acceptance-test SQL servers
//!
//! Interrupted test runs leave servers behind in a shared account. The
//! control plane can only list servers account-wide, so the sweeper lists
//! everything once and narrows the result client-side with [`SweepFilter`].
//! The filter is the only thing standing between the sweeper and servers
//! owned by other actors: anything outside the reserved name prefix or the
//! requested region is never deleted.

use crate::arm::{ArmError, ServerSnapshot, SqlServerOperations};
use crate::config::{FailurePolicy, SweepConfig};
use armctl_common::defaults::SQL_SERVERS_COLLECTION;
use armctl_common::naming::is_acceptance_test_name;
use armctl_common::resource_id::{ResourceId, ResourceIdError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Decides which listed servers belong to the test namespace of a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFilter {
    pub name_prefix: String,
    pub target_region: String,
}

impl SweepFilter {
    pub fn new(name_prefix: impl Into<String>, target_region: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            target_region: target_region.into(),
        }
    }

    /// Case-sensitive prefix match on the name, exact match on the location.
    pub fn matches(&self, name: &str, location: &str) -> bool {
        location == self.target_region && is_acceptance_test_name(name, &self.name_prefix)
    }

    pub fn matches_snapshot(&self, snapshot: &ServerSnapshot) -> bool {
        self.matches(&snapshot.name, &snapshot.location)
    }
}

impl From<&SweepConfig> for SweepFilter {
    fn from(config: &SweepConfig) -> Self {
        Self::new(&config.name_prefix, &config.region)
    }
}

/// Result of sweeping a single server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepResult {
    /// Server was deleted
    Deleted,
    /// Server vanished between list and delete
    AlreadyDeleted,
    /// Delete or identifier parse failed
    Failed,
    /// Dry run: nothing was deleted
    Skipped,
}

/// Report of a sweep
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub total_listed: usize,
    pub matched: usize,
    pub deleted: usize,
    pub already_deleted: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SweepReport {
    fn record(&mut self, result: SweepResult) {
        match result {
            SweepResult::Deleted => self.deleted += 1,
            SweepResult::AlreadyDeleted => self.already_deleted += 1,
            SweepResult::Failed => self.failed += 1,
            SweepResult::Skipped => self.skipped += 1,
        }
    }
}

/// Sweep failures. Each names the region and, where known, the server.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The account-wide list call failed
    #[error("Error listing SQL servers while sweeping region {region}")]
    List {
        region: String,
        #[source]
        source: ArmError,
    },

    /// A matched server carried an identifier that could not be parsed
    #[error("SQL server {name} in region {region} has a malformed identifier")]
    MalformedIdentifier {
        name: String,
        region: String,
        #[source]
        source: ResourceIdError,
    },

    /// Deleting a matched server failed
    #[error("Error deleting SQL server {name} (resource group: {resource_group}) in region {region}")]
    Delete {
        resource_group: String,
        name: String,
        region: String,
        #[source]
        source: ArmError,
    },

    /// Continue-on-error sweep finished with failures
    #[error(
        "{} of {} matched SQL servers failed to sweep in region {region}: {}",
        .failures.len(),
        .report.matched,
        .failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
    )]
    Partial {
        region: String,
        report: SweepReport,
        failures: Vec<SweepError>,
    },
}

/// Lists, filters and deletes leaked test servers
pub struct Sweeper<C> {
    client: C,
}

impl<C: SqlServerOperations> Sweeper<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Sweep `region` with the default prefix (or `ARM_SWEEP_PREFIX`),
    /// failing fast and deleting for real.
    pub async fn sweep_region(&self, region: &str) -> Result<SweepReport, SweepError> {
        self.sweep(&SweepConfig::from_env(region)).await
    }

    /// Sweep one region.
    ///
    /// With [`FailurePolicy::FailFast`] the first failure is returned as-is.
    /// With [`FailurePolicy::ContinueOnError`] every match is attempted and
    /// failures come back together as [`SweepError::Partial`].
    pub async fn sweep(&self, config: &SweepConfig) -> Result<SweepReport, SweepError> {
        let filter = SweepFilter::from(config);

        info!(
            region = %config.region,
            prefix = %config.name_prefix,
            dry_run = config.dry_run,
            policy = ?config.policy,
            "Retrieving SQL servers"
        );

        let servers = self.client.list().await.map_err(|source| SweepError::List {
            region: config.region.clone(),
            source,
        })?;

        let mut report = SweepReport {
            total_listed: servers.len(),
            ..Default::default()
        };

        let matches: Vec<&ServerSnapshot> = servers
            .iter()
            .filter(|s| {
                let keep = filter.matches_snapshot(s);
                if !keep {
                    debug!(name = %s.name, location = %s.location, "Skipping (outside sweep scope)");
                }
                keep
            })
            .collect();
        report.matched = matches.len();

        if matches.is_empty() {
            info!(region = %config.region, listed = report.total_listed, "No SQL servers to sweep");
            return Ok(report);
        }

        info!(count = matches.len(), region = %config.region, "Found SQL servers to sweep");

        let mut failures = Vec::new();
        for server in matches {
            let (result, error) = self.sweep_one(server, config).await;
            report.record(result);

            if let Some(err) = error {
                match config.policy {
                    FailurePolicy::FailFast => return Err(err),
                    FailurePolicy::ContinueOnError => failures.push(err),
                }
            }
        }

        info!(
            region = %config.region,
            deleted = report.deleted,
            already_deleted = report.already_deleted,
            failed = report.failed,
            skipped = report.skipped,
            "Sweep finished"
        );

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(SweepError::Partial {
                region: config.region.clone(),
                report,
                failures,
            })
        }
    }

    async fn sweep_one(
        &self,
        server: &ServerSnapshot,
        config: &SweepConfig,
    ) -> (SweepResult, Option<SweepError>) {
        let id = match parse_server_id(&server.id) {
            Ok(id) => id,
            Err(source) => {
                warn!(name = %server.name, id = %server.id, error = %source, "Malformed identifier");
                return (
                    SweepResult::Failed,
                    Some(SweepError::MalformedIdentifier {
                        name: server.name.clone(),
                        region: config.region.clone(),
                        source,
                    }),
                );
            }
        };
        let resource_group = id.resource_group.as_str();
        let name = id.path_value(SQL_SERVERS_COLLECTION).unwrap_or(id.name());

        if config.dry_run {
            info!(resource_group = %resource_group, name = %name, "[DRY RUN] Would delete SQL server");
            return (SweepResult::Skipped, None);
        }

        info!(resource_group = %resource_group, name = %name, "Deleting SQL server");
        let result = self
            .client
            .delete(resource_group, name, CancellationToken::new())
            .wait()
            .await
            .into_result();

        match result {
            Ok(_) => {
                info!(resource_group = %resource_group, name = %name, "Deleted");
                (SweepResult::Deleted, None)
            }
            Err(e) if e.is_not_found() => {
                debug!(resource_group = %resource_group, name = %name, "Already deleted");
                (SweepResult::AlreadyDeleted, None)
            }
            Err(e) => {
                warn!(resource_group = %resource_group, name = %name, error = %e, "Failed to delete");
                (
                    SweepResult::Failed,
                    Some(SweepError::Delete {
                        resource_group: resource_group.to_string(),
                        name: name.to_string(),
                        region: config.region.clone(),
                        source: e,
                    }),
                )
            }
        }
    }
}

/// Parse a server identifier, requiring a `servers` segment.
fn parse_server_id(raw: &str) -> Result<ResourceId, ResourceIdError> {
    let id = ResourceId::parse(raw)?;
    if id.path_value(SQL_SERVERS_COLLECTION).is_none() {
        return Err(ResourceIdError::MalformedIdentifier {
            id: raw.to_string(),
            reason: "no servers segment",
        });
    }
    Ok(id)
}
