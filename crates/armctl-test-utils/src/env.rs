//! Test environment utilities
//!
//! Provides location/subscription detection and tracing setup for tests.

use armctl_common::defaults::{DEFAULT_TEST_LOCATION, ENV_SUBSCRIPTION_ID, ENV_TEST_LOCATION};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Subscription used when `ARM_SUBSCRIPTION_ID` is unset
pub const TEST_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Get the location for tests.
///
/// Checks `ARM_TEST_LOCATION`, falling back to `westus`.
///
/// # Example
///
/// ```
/// use armctl_test_utils::env::get_test_location;
///
/// let location = get_test_location();
/// assert!(!location.is_empty());
/// ```
pub fn get_test_location() -> String {
    lookup_or(ENV_TEST_LOCATION, DEFAULT_TEST_LOCATION, |k| std::env::var(k).ok())
}

/// Get the subscription for minting resource identifiers.
pub fn get_subscription_id() -> String {
    lookup_or(ENV_SUBSCRIPTION_ID, TEST_SUBSCRIPTION_ID, |k| std::env::var(k).ok())
}

fn lookup_or(key: &str, default: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber (once per process).
///
/// Honors `RUST_LOG`; output goes through the test writer so it is only
/// shown for failing tests.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("armctl=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
