//! Trigger cycle orchestration.

use crate::context::{Clock, RandomSource};
use crate::gate::{Admission, TriggerGate};
use crate::metrics::LatencyTimer;
use crate::planner::BuildPlanner;
use crate::submitter::{BuildSubmitter, SubmissionReport};
use crate::trimmer::BuildTrimmer;
use futures::stream::{self, StreamExt};
use pkgmatrix_core::ids::PackageId;
use pkgmatrix_core::matrix::Matrix;
use pkgmatrix_core::ports::{
    BuildQueue, BuildRepository, CycleReport, MetricsSink, PackageRepository, VersionRepository,
};
use pkgmatrix_core::settings::{CallbackParams, TriggerSettings};
use pkgmatrix_core::{Error, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{error, info, instrument, warn};

/// Which packages a cycle considers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerMode {
    /// The oldest candidates, up to the limit.
    Limit(u32),
    /// Exactly these packages.
    Packages(Vec<PackageId>),
}

/// Ports a scheduler is wired to.
#[derive(Clone)]
pub struct SchedulerPorts {
    pub packages: Arc<dyn PackageRepository>,
    pub versions: Arc<dyn VersionRepository>,
    pub builds: Arc<dyn BuildRepository>,
    pub queue: Arc<dyn BuildQueue>,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
    pub metrics: Arc<dyn MetricsSink>,
}

#[derive(Debug)]
enum PackageOutcome {
    Cancelled,
    Rejected(Admission),
    GateError,
    Failed,
    Submitted(SubmissionReport),
}

/// Runs trim, select, gate and submit cycles.
pub struct TriggerScheduler {
    planner: BuildPlanner,
    trimmer: BuildTrimmer,
    gate: TriggerGate,
    submitter: BuildSubmitter,
    metrics: Arc<dyn MetricsSink>,
    max_concurrent_packages: usize,
    cycle_lock: Mutex<()>,
}

impl TriggerScheduler {
    /// Wire a scheduler. Invalid settings are rejected here, before any
    /// cycle can run.
    pub fn new(
        ports: SchedulerPorts,
        settings: TriggerSettings,
        callback: CallbackParams,
        matrix: Matrix,
    ) -> Result<Self> {
        settings.validate()?;
        callback.validate()?;
        if matrix.is_empty() {
            return Err(Error::Configuration("build matrix is empty".to_string()));
        }

        Ok(Self {
            planner: BuildPlanner::new(ports.versions.clone(), ports.builds.clone(), matrix),
            trimmer: BuildTrimmer::new(ports.builds.clone(), ports.clock, settings.stale_after()),
            submitter: BuildSubmitter::new(
                ports.packages,
                ports.versions,
                ports.builds,
                ports.queue.clone(),
                callback,
            ),
            max_concurrent_packages: settings.max_concurrent_packages,
            gate: TriggerGate::new(ports.queue, ports.random, settings),
            metrics: ports.metrics,
            cycle_lock: Mutex::new(()),
        })
    }

    pub fn planner(&self) -> &BuildPlanner {
        &self.planner
    }

    pub fn trimmer(&self) -> &BuildTrimmer {
        &self.trimmer
    }

    /// Run one cycle.
    ///
    /// Fails with [`Error::CycleInProgress`] if another cycle is running on
    /// this scheduler. The shutdown signal is checked before each package;
    /// packages already in flight finish.
    #[instrument(skip(self, shutdown))]
    pub async fn run_cycle(
        &self,
        mode: TriggerMode,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<CycleReport> {
        let _guard = self
            .cycle_lock
            .try_lock()
            .map_err(|_| Error::CycleInProgress)?;

        let timer = LatencyTimer::start();
        let result = self.cycle(mode, shutdown).await;
        self.metrics
            .record_trigger_cycle(timer.elapsed(), result.as_ref().ok());

        match &result {
            Ok(report) => info!(
                trimmed = report.trimmed,
                candidates = report.candidates,
                admitted = report.admitted,
                triggered = report.triggered,
                conflicts = report.conflicts,
                failed = report.failed,
                cancelled = report.cancelled,
                duration_ms = timer.elapsed_ms(),
                "Trigger cycle finished"
            ),
            Err(e) => error!(error = %e, "Trigger cycle failed"),
        }
        result
    }

    async fn cycle(&self, mode: TriggerMode, shutdown: &watch::Receiver<bool>) -> Result<CycleReport> {
        let mut report = CycleReport {
            trimmed: self.trimmer.trim_builds().await?,
            ..Default::default()
        };

        let candidates = match mode {
            TriggerMode::Limit(limit) => self.planner.fetch_build_candidates(limit).await?,
            TriggerMode::Packages(ids) => ids,
        };
        report.candidates = candidates.len() as u64;

        let outcomes: Vec<PackageOutcome> = stream::iter(candidates)
            .map(|package_id| self.process_package(package_id, shutdown))
            .buffer_unordered(self.max_concurrent_packages)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                PackageOutcome::Cancelled => report.cancelled = true,
                PackageOutcome::Rejected(Admission::Disabled) => report.rejected_disabled += 1,
                PackageOutcome::Rejected(Admission::AtCapacity) => report.rejected_capacity += 1,
                PackageOutcome::Rejected(Admission::Downscaled) => {
                    report.rejected_downscaled += 1
                }
                PackageOutcome::Rejected(Admission::Admitted) => {}
                PackageOutcome::GateError => report.gate_errors += 1,
                PackageOutcome::Failed => {
                    report.admitted += 1;
                    report.package_errors += 1;
                }
                PackageOutcome::Submitted(submission) => {
                    report.admitted += 1;
                    report.triggered += submission.triggered;
                    report.conflicts += submission.conflicts;
                    report.failed += submission.failed;
                    report.skipped += submission.skipped;
                }
            }
        }
        Ok(report)
    }

    async fn process_package(
        &self,
        package_id: PackageId,
        shutdown: &watch::Receiver<bool>,
    ) -> PackageOutcome {
        if *shutdown.borrow() {
            return PackageOutcome::Cancelled;
        }

        match self.gate.admit(package_id).await {
            Ok(Admission::Admitted) => {}
            Ok(rejection) => return PackageOutcome::Rejected(rejection),
            Err(e) => {
                warn!(%package_id, error = %e, "Gate check failed, skipping package");
                return PackageOutcome::GateError;
            }
        }

        match self.plan_and_submit(package_id).await {
            Ok(report) => PackageOutcome::Submitted(report),
            Err(e) => {
                error!(%package_id, error = %e, "Package submission failed");
                PackageOutcome::Failed
            }
        }
    }

    async fn plan_and_submit(&self, package_id: PackageId) -> Result<SubmissionReport> {
        let missing = self.planner.find_missing_builds(package_id).await?;
        self.submitter.submit(package_id, &missing).await
    }
}
