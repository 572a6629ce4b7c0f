//! Scheduler settings shared by the gate, the submitter and the trimmer.

use crate::ids::PackageId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Knobs controlling whether, and how many, builds are triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSettings {
    /// Global kill switch for build triggers.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum number of CI jobs allowed in flight before admission stops.
    #[serde(default = "default_pipeline_limit")]
    pub pipeline_limit: u64,
    /// Fraction of eligible packages admitted per cycle, in `[0, 1]`.
    #[serde(default = "default_downscaling_rate")]
    pub downscaling_rate: f64,
    /// Age after which a `pending` cell of a significant version is reclaimed.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Maximum number of packages selected per cycle.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: u32,
    /// Packages gated and submitted concurrently within a cycle.
    #[serde(default = "default_max_concurrent_packages")]
    pub max_concurrent_packages: usize,
    /// Packages exempt from downscaling.
    #[serde(default)]
    pub allow_list: Vec<PackageId>,
}

fn default_enabled() -> bool {
    true
}

fn default_pipeline_limit() -> u64 {
    200
}

fn default_downscaling_rate() -> f64 {
    1.0
}

fn default_stale_after_secs() -> u64 {
    3 * 60 * 60
}

fn default_candidate_limit() -> u32 {
    10
}

fn default_max_concurrent_packages() -> usize {
    4
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            pipeline_limit: default_pipeline_limit(),
            downscaling_rate: default_downscaling_rate(),
            stale_after_secs: default_stale_after_secs(),
            candidate_limit: default_candidate_limit(),
            max_concurrent_packages: default_max_concurrent_packages(),
            allow_list: vec![],
        }
    }
}

impl TriggerSettings {
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_secs.min(i64::MAX as u64) as i64)
    }

    pub fn is_allow_listed(&self, package_id: PackageId) -> bool {
        self.allow_list.contains(&package_id)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.downscaling_rate) {
            return Err(Error::Configuration(format!(
                "trigger.downscaling_rate must be within [0, 1], got {}",
                self.downscaling_rate
            )));
        }
        if self.max_concurrent_packages == 0 {
            return Err(Error::Configuration(
                "trigger.max_concurrent_packages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters a build job needs to report its result back to the site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    /// Base URL of the site API the builder posts results to.
    #[serde(default)]
    pub api_base_url: String,
    /// Token the builder authenticates with.
    #[serde(default)]
    pub builder_token: String,
}

impl CallbackParams {
    pub fn new(api_base_url: impl Into<String>, builder_token: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            builder_token: builder_token.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Configuration("site.api_base_url is not set".to_string()));
        }
        url::Url::parse(&self.api_base_url).map_err(|e| {
            Error::Configuration(format!(
                "site.api_base_url is not a valid URL ({}): {}",
                self.api_base_url, e
            ))
        })?;
        if self.builder_token.trim().is_empty() {
            return Err(Error::Configuration("site.builder_token is not set".to_string()));
        }
        Ok(())
    }
}
