//! Counters for reconciliation and trigger cycles.

use pkgmatrix_core::ports::{CycleReport, MetricsSink, ReconcileReport};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Metrics for the scheduler.
#[derive(Debug, Default)]
pub struct TriggerMetrics {
    /// Reconciliations attempted.
    pub reconcile_runs: AtomicU64,
    /// Reconciliations aborted by an error.
    pub reconcile_failures: AtomicU64,
    pub packages_added: AtomicU64,
    pub packages_deleted: AtomicU64,
    /// Trigger cycles attempted.
    pub cycles: AtomicU64,
    /// Trigger cycles aborted by an error.
    pub cycle_failures: AtomicU64,
    pub builds_trimmed: AtomicU64,
    /// Packages selected for a gate check.
    pub candidates_selected: AtomicU64,
    pub packages_admitted: AtomicU64,
    pub rejected_disabled: AtomicU64,
    pub rejected_capacity: AtomicU64,
    pub rejected_downscaled: AtomicU64,
    pub gate_errors: AtomicU64,
    pub package_errors: AtomicU64,
    pub builds_triggered: AtomicU64,
    pub build_conflicts: AtomicU64,
    pub build_failures: AtomicU64,
    /// Missing cells left alone because their version cannot be built.
    pub cells_skipped: AtomicU64,
    pub last_reconcile_ms: AtomicU64,
    pub last_cycle_ms: AtomicU64,
}

impl TriggerMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reconcile_runs: self.reconcile_runs.load(Ordering::Relaxed),
            reconcile_failures: self.reconcile_failures.load(Ordering::Relaxed),
            packages_added: self.packages_added.load(Ordering::Relaxed),
            packages_deleted: self.packages_deleted.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            cycle_failures: self.cycle_failures.load(Ordering::Relaxed),
            builds_trimmed: self.builds_trimmed.load(Ordering::Relaxed),
            candidates_selected: self.candidates_selected.load(Ordering::Relaxed),
            packages_admitted: self.packages_admitted.load(Ordering::Relaxed),
            rejected_disabled: self.rejected_disabled.load(Ordering::Relaxed),
            rejected_capacity: self.rejected_capacity.load(Ordering::Relaxed),
            rejected_downscaled: self.rejected_downscaled.load(Ordering::Relaxed),
            gate_errors: self.gate_errors.load(Ordering::Relaxed),
            package_errors: self.package_errors.load(Ordering::Relaxed),
            builds_triggered: self.builds_triggered.load(Ordering::Relaxed),
            build_conflicts: self.build_conflicts.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            cells_skipped: self.cells_skipped.load(Ordering::Relaxed),
            last_reconcile_ms: self.last_reconcile_ms.load(Ordering::Relaxed),
            last_cycle_ms: self.last_cycle_ms.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for TriggerMetrics {
    fn record_reconcile(&self, duration: Duration, outcome: Option<&ReconcileReport>) {
        self.reconcile_runs.fetch_add(1, Ordering::Relaxed);
        self.last_reconcile_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
        match outcome {
            Some(report) => {
                self.packages_added.fetch_add(report.added, Ordering::Relaxed);
                self.packages_deleted
                    .fetch_add(report.deleted, Ordering::Relaxed);
            }
            None => {
                self.reconcile_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        debug!(duration_ms = duration.as_millis() as u64, ok = outcome.is_some(), "Recorded reconcile");
    }

    fn record_trigger_cycle(&self, duration: Duration, outcome: Option<&CycleReport>) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
        let Some(report) = outcome else {
            self.cycle_failures.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let counters = [
            (&self.builds_trimmed, report.trimmed),
            (&self.candidates_selected, report.candidates),
            (&self.packages_admitted, report.admitted),
            (&self.rejected_disabled, report.rejected_disabled),
            (&self.rejected_capacity, report.rejected_capacity),
            (&self.rejected_downscaled, report.rejected_downscaled),
            (&self.gate_errors, report.gate_errors),
            (&self.package_errors, report.package_errors),
            (&self.builds_triggered, report.triggered),
            (&self.build_conflicts, report.conflicts),
            (&self.build_failures, report.failed),
            (&self.cells_skipped, report.skipped),
        ];
        for (counter, value) in counters {
            counter.fetch_add(value, Ordering::Relaxed);
        }
        debug!(duration_ms = duration.as_millis() as u64, "Recorded trigger cycle");
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub reconcile_runs: u64,
    pub reconcile_failures: u64,
    pub packages_added: u64,
    pub packages_deleted: u64,
    pub cycles: u64,
    pub cycle_failures: u64,
    pub builds_trimmed: u64,
    pub candidates_selected: u64,
    pub packages_admitted: u64,
    pub rejected_disabled: u64,
    pub rejected_capacity: u64,
    pub rejected_downscaled: u64,
    pub gate_errors: u64,
    pub package_errors: u64,
    pub builds_triggered: u64,
    pub build_conflicts: u64,
    pub build_failures: u64,
    pub cells_skipped: u64,
    pub last_reconcile_ms: u64,
    pub last_cycle_ms: u64,
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_cycle_counts_failure_only() {
        let metrics = TriggerMetrics::new();
        metrics.record_trigger_cycle(Duration::from_millis(12), None);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cycles, 1);
        assert_eq!(snapshot.cycle_failures, 1);
        assert_eq!(snapshot.builds_triggered, 0);
        assert_eq!(snapshot.last_cycle_ms, 12);
    }

    #[test]
    fn test_reports_accumulate() {
        let metrics = TriggerMetrics::new();
        let report = CycleReport {
            triggered: 5,
            rejected_downscaled: 2,
            ..Default::default()
        };
        metrics.record_trigger_cycle(Duration::ZERO, Some(&report));
        metrics.record_trigger_cycle(Duration::ZERO, Some(&report));
        metrics.record_reconcile(
            Duration::ZERO,
            Some(&ReconcileReport {
                added: 3,
                deleted: 1,
            }),
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.builds_triggered, 10);
        assert_eq!(snapshot.rejected_downscaled, 4);
        assert_eq!(snapshot.packages_added, 3);
        assert_eq!(snapshot.packages_deleted, 1);
        assert_eq!(snapshot.reconcile_failures, 0);
    }

    #[test]
    fn test_candidates_and_skipped_cells_counted() {
        let metrics = TriggerMetrics::new();
        let report = CycleReport {
            candidates: 3,
            skipped: 25,
            ..Default::default()
        };
        metrics.record_trigger_cycle(Duration::ZERO, Some(&report));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.candidates_selected, 3);
        assert_eq!(snapshot.cells_skipped, 25);
    }
}
