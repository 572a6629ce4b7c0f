//! Admission control for build submission.

use crate::context::RandomSource;
use pkgmatrix_core::Result;
use pkgmatrix_core::ids::PackageId;
use pkgmatrix_core::ports::BuildQueue;
use pkgmatrix_core::settings::TriggerSettings;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Gate decision for one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Triggers are switched off globally.
    Disabled,
    /// The CI system has no headroom.
    AtCapacity,
    /// Lost the downscaling draw.
    Downscaled,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Admission::Admitted => "admitted",
            Admission::Disabled => "disabled",
            Admission::AtCapacity => "at_capacity",
            Admission::Downscaled => "downscaled",
        };
        f.write_str(s)
    }
}

pub struct TriggerGate {
    queue: Arc<dyn BuildQueue>,
    random: Arc<dyn RandomSource>,
    settings: TriggerSettings,
}

impl TriggerGate {
    pub fn new(
        queue: Arc<dyn BuildQueue>,
        random: Arc<dyn RandomSource>,
        settings: TriggerSettings,
    ) -> Self {
        Self {
            queue,
            random,
            settings,
        }
    }

    /// Decide whether `package_id` may submit builds this cycle.
    ///
    /// Checks run in order and stop at the first rejection: the global
    /// switch, then CI occupancy against the pipeline limit, then a fresh
    /// downscaling sample. Allow-listed packages skip the sample.
    pub async fn admit(&self, package_id: PackageId) -> Result<Admission> {
        if !self.settings.enabled {
            return Ok(Admission::Disabled);
        }

        let occupancy = self.queue.occupancy().await?;
        if occupancy >= self.settings.pipeline_limit {
            debug!(
                %package_id,
                occupancy,
                limit = self.settings.pipeline_limit,
                "CI at capacity"
            );
            return Ok(Admission::AtCapacity);
        }

        if self.settings.is_allow_listed(package_id) {
            return Ok(Admission::Admitted);
        }

        let sample = self.random.sample();
        if sample <= self.settings.downscaling_rate {
            Ok(Admission::Admitted)
        } else {
            debug!(%package_id, sample, rate = self.settings.downscaling_rate, "Downscaled");
            Ok(Admission::Downscaled)
        }
    }
}
