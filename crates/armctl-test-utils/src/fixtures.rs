//! Desired-state presets mirroring the SQL server acceptance scenarios

use armctl::arm::{DeclaredResource, ResourceRef};
use armctl_common::naming::{resource_group_name, sql_server_name};
use rand::Rng;

/// Administrator password used by every preset
pub const TEST_ADMIN_PASSWORD: &str = "thisIsDog11";

/// Random suffix for generated names
pub fn rand_int() -> u64 {
    rand::thread_rng().gen_range(100_000..1_000_000_000)
}

/// A SQL server declared in its own resource group, named from `ri`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlServerFixture {
    pub ri: u64,
    pub location: String,
}

impl SqlServerFixture {
    pub fn new(ri: u64, location: impl Into<String>) -> Self {
        Self {
            ri,
            location: location.into(),
        }
    }

    /// Fixture with a random suffix
    pub fn random(location: impl Into<String>) -> Self {
        Self::new(rand_int(), location)
    }

    pub fn resource_group(&self) -> String {
        resource_group_name(self.ri)
    }

    pub fn server_name(&self) -> String {
        sql_server_name(self.ri)
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.resource_group(), self.server_name())
    }

    /// Server with no tags
    pub fn basic(&self) -> DeclaredResource {
        DeclaredResource::new(self.resource_group(), self.server_name(), &self.location)
            .with_password(TEST_ADMIN_PASSWORD)
    }

    /// Server tagged `environment=staging`, `database=test`
    pub fn with_tags(&self) -> DeclaredResource {
        self.basic()
            .with_tags([("environment", "staging"), ("database", "test")])
    }

    /// Same server after the tag update: `environment=production`
    pub fn with_tags_updated(&self) -> DeclaredResource {
        self.basic().with_tags([("environment", "production")])
    }
}
