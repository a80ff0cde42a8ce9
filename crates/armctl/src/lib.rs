//! armctl - lifecycle assertions and orphan sweeping for managed SQL servers
//!
//! This crate keeps acceptance tests honest against a shared cloud account:
//! the [`lifecycle`] controller verifies that declared servers appear,
//! converge and disappear, and the [`sweeper`] removes servers leaked by
//! interrupted runs without touching anything outside the test namespace.

pub mod arm;
pub mod config;
pub mod lifecycle;
pub mod sweeper;
pub mod wait;

pub use arm::{ArmError, DeclaredResource, DeletionHandle, ResourceRef, ServerSnapshot, SqlServerOperations};
pub use config::{FailurePolicy, SweepConfig};
pub use lifecycle::{LifecycleController, LifecycleError};
pub use sweeper::{SweepError, SweepFilter, SweepReport, Sweeper};
pub use wait::{WaitConfig, WaitError, poll_until};
