//! Default values shared by the controller, sweeper and test suites

/// Location used when `ARM_TEST_LOCATION` is unset
pub const DEFAULT_TEST_LOCATION: &str = "westus";

/// Provider namespace for SQL servers
pub const SQL_PROVIDER: &str = "Microsoft.Sql";

/// Collection keyword for SQL servers
pub const SQL_SERVERS_COLLECTION: &str = "servers";

/// Server version requested by the acceptance fixtures
pub const DEFAULT_SQL_VERSION: &str = "12.0";

/// Administrator login requested by the acceptance fixtures
pub const DEFAULT_ADMIN_LOGIN: &str = "mradministrator";

/// Environment variable naming the test location
pub const ENV_TEST_LOCATION: &str = "ARM_TEST_LOCATION";

/// Environment variable naming the subscription
pub const ENV_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";

/// Environment variable overriding the sweep prefix
pub const ENV_SWEEP_PREFIX: &str = "ARM_SWEEP_PREFIX";
