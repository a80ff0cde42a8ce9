//! Shared test utilities for armctl
//!
//! ## Modules
//!
//! - [`control_plane`]: In-memory SQL server control plane with fault injection
//! - [`env`]: Test location/subscription detection
//! - [`fixtures`]: Acceptance-test desired-state presets

pub mod control_plane;
pub mod env;
pub mod fixtures;

pub use control_plane::InMemoryControlPlane;
pub use env::{get_subscription_id, get_test_location, init_tracing};
pub use fixtures::{SqlServerFixture, rand_int};
