//! armctl-common - Shared types and utilities
//!
//! Pure, I/O-free building blocks used by the controller, the sweeper and
//! the test suites.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values and environment keys
//! - [`naming`]: Reserved naming convention for acceptance-test resources
//! - [`resource_id`]: Control-plane resource identifier parsing

pub mod defaults;
pub mod naming;
pub mod resource_id;

pub use naming::{ACCTEST_PREFIX, is_acceptance_test_name};
pub use resource_id::{ResourceId, ResourceIdError};
