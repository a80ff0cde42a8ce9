//! Configuration types for sweeping

use armctl_common::defaults::ENV_SWEEP_PREFIX;
use armctl_common::naming::ACCTEST_PREFIX;

/// What the sweeper does after a delete fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure and report it
    #[default]
    FailFast,
    /// Attempt every match, then report all failures together
    ContinueOnError,
}

/// Sweep configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Only servers in this location are swept (exact match)
    pub region: String,
    /// Reserved name prefix; servers outside it are never touched
    pub name_prefix: String,
    /// Behavior on delete failure
    pub policy: FailurePolicy,
    /// Log matches without deleting anything
    pub dry_run: bool,
}

impl SweepConfig {
    /// Sweep `region` with the default prefix, fail-fast, deleting for real.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            name_prefix: ACCTEST_PREFIX.to_string(),
            policy: FailurePolicy::default(),
            dry_run: false,
        }
    }

    /// Like [`new`](Self::new), honoring `ARM_SWEEP_PREFIX` when set.
    pub fn from_env(region: impl Into<String>) -> Self {
        Self::from_lookup(region, |key| std::env::var(key).ok())
    }

    fn from_lookup(region: impl Into<String>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new(region);
        if let Some(prefix) = lookup(ENV_SWEEP_PREFIX).filter(|p| !p.trim().is_empty()) {
            config.name_prefix = prefix.trim().to_string();
        }
        config
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
