//! Package list reconciliation and build trigger scheduling for pkgmatrix.
//!
//! A trigger cycle trims stale build records, selects candidate packages,
//! passes each through the [`TriggerGate`] and hands the admitted ones to
//! the [`BuildSubmitter`]. The [`PackageListReconciler`] runs on its own
//! schedule.

pub mod context;
pub mod gate;
pub mod metrics;
pub mod planner;
pub mod reconciler;
pub mod scheduler;
pub mod submitter;
pub mod trimmer;

#[cfg(test)]
mod testing;

pub use context::{Clock, FixedClock, FixedSample, RandomSource, SystemClock, ThreadRandom};
pub use gate::{Admission, TriggerGate};
pub use metrics::{LatencyTimer, MetricsSnapshot, TriggerMetrics};
pub use planner::BuildPlanner;
pub use reconciler::{PackageListReconciler, UrlDiff};
pub use scheduler::{SchedulerPorts, TriggerMode, TriggerScheduler};
pub use submitter::{BuildSubmitter, SubmissionReport};
pub use trimmer::BuildTrimmer;
