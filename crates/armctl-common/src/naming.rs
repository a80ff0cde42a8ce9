//! Naming conventions for acceptance-test resources
//!
//! Every resource created by the acceptance suite is named with a reserved
//! literal prefix. The sweeper relies on this namespace, and nothing outside
//! it, to decide what it may delete from a shared account.
//!
//! | Resource | Pattern |
//! |----------|---------|
//! | SQL server | `acctestsqlserver{n}` |
//! | Resource group | `acctestRG_{n}` |

/// Reserved prefix for every generated test resource
pub const ACCTEST_PREFIX: &str = "acctest";

/// Prefix for generated SQL server names
pub const SQL_SERVER_PREFIX: &str = "acctestsqlserver";

/// Prefix for generated resource group names
pub const RESOURCE_GROUP_PREFIX: &str = "acctestRG_";

/// Check whether a name lives in the reserved test namespace.
///
/// Matching is case-sensitive: `AccTestServer` is not a test resource.
pub fn is_acceptance_test_name(name: &str, prefix: &str) -> bool {
    !prefix.is_empty() && name.starts_with(prefix)
}

/// Name of the SQL server generated for suffix `n`
pub fn sql_server_name(n: u64) -> String {
    format!("{SQL_SERVER_PREFIX}{n}")
}

/// Name of the resource group generated for suffix `n`
pub fn resource_group_name(n: u64) -> String {
    format!("{RESOURCE_GROUP_PREFIX}{n}")
}
