//! Keeps the tracked package set in sync with the package listing.

use crate::metrics::LatencyTimer;
use pkgmatrix_core::Result;
use pkgmatrix_core::package::{PackageUrl, TrackedPackage};
use pkgmatrix_core::ports::{MetricsSink, PackageListSource, PackageRepository, ReconcileReport};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Packages to start and stop tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlDiff {
    /// Listed but not tracked, in listing order.
    pub to_add: Vec<PackageUrl>,
    /// Tracked but no longer listed, in stored order.
    pub to_delete: Vec<PackageUrl>,
}

impl UrlDiff {
    /// Set difference between the listing and the tracked URLs.
    ///
    /// URLs are compared in canonical form. Duplicates collapse and entries
    /// that do not parse are dropped with a warning.
    pub fn compute(source: &[String], current: &[String]) -> Self {
        let source = canonical_set(source, "listed");
        let current = canonical_set(current, "tracked");

        let tracked: HashSet<&PackageUrl> = current.iter().collect();
        let listed: HashSet<&PackageUrl> = source.iter().collect();

        Self {
            to_add: source
                .iter()
                .filter(|url| !tracked.contains(url))
                .cloned()
                .collect(),
            to_delete: current
                .iter()
                .filter(|url| !listed.contains(url))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }
}

fn canonical_set(raw: &[String], origin: &str) -> Vec<PackageUrl> {
    let mut seen = HashSet::new();
    let mut urls = Vec::with_capacity(raw.len());
    for entry in raw {
        match PackageUrl::parse(entry) {
            Ok(url) => {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            Err(e) => warn!(origin, url = %entry, error = %e, "Dropping malformed package URL"),
        }
    }
    urls
}

/// Applies the listing to the package store.
pub struct PackageListReconciler {
    source: Arc<dyn PackageListSource>,
    packages: Arc<dyn PackageRepository>,
    metrics: Arc<dyn MetricsSink>,
}

impl PackageListReconciler {
    pub fn new(
        source: Arc<dyn PackageListSource>,
        packages: Arc<dyn PackageRepository>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            source,
            packages,
            metrics,
        }
    }

    /// Fetch the listing and the tracked set, then add and delete packages.
    ///
    /// Nothing is written unless both fetches succeed.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let timer = LatencyTimer::start();
        let result = self.apply().await;
        self.metrics
            .record_reconcile(timer.elapsed(), result.as_ref().ok());
        if let Err(e) = &result {
            warn!(error = %e, "Reconciliation failed");
        }
        result
    }

    async fn apply(&self) -> Result<ReconcileReport> {
        let (listed, tracked) = tokio::try_join!(self.source.fetch(), self.packages.list_urls())?;
        let diff = UrlDiff::compute(&listed, &tracked);

        let mut report = ReconcileReport::default();
        if !diff.to_add.is_empty() {
            let new: Vec<TrackedPackage> =
                diff.to_add.into_iter().map(TrackedPackage::new).collect();
            report.added = self.packages.insert_many(&new).await?;
        }
        for url in &diff.to_delete {
            report.deleted += self.packages.delete_by_url(url).await?;
        }

        info!(
            listed = listed.len(),
            tracked = tracked.len(),
            added = report.added,
            deleted = report.deleted,
            "Package list reconciled"
        );
        Ok(report)
    }
}
