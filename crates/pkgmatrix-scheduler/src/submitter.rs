//! Claims missing cells and submits them to the CI system.

use futures::future::join_all;
use pkgmatrix_core::build::{BuildCell, BuildPair, MissingBuilds};
use pkgmatrix_core::ids::{PackageId, VersionId};
use pkgmatrix_core::package::PackageUrl;
use pkgmatrix_core::ports::{
    BuildJob, BuildQueue, BuildRepository, PackageRepository, VersionRepository,
};
use pkgmatrix_core::settings::CallbackParams;
use pkgmatrix_core::version::Reference;
use pkgmatrix_core::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Per-cell outcomes of one package submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    /// Cells claimed and accepted by the CI system.
    pub triggered: u64,
    /// Cells already claimed elsewhere.
    pub conflicts: u64,
    /// Cells whose claim or trigger call failed.
    pub failed: u64,
    /// Cells of versions that cannot be built.
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellOutcome {
    Triggered,
    Conflict,
    Failed,
}

impl SubmissionReport {
    fn record(&mut self, outcome: CellOutcome) {
        match outcome {
            CellOutcome::Triggered => self.triggered += 1,
            CellOutcome::Conflict => self.conflicts += 1,
            CellOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct BuildSubmitter {
    packages: Arc<dyn PackageRepository>,
    versions: Arc<dyn VersionRepository>,
    builds: Arc<dyn BuildRepository>,
    queue: Arc<dyn BuildQueue>,
    callback: CallbackParams,
}

impl BuildSubmitter {
    pub fn new(
        packages: Arc<dyn PackageRepository>,
        versions: Arc<dyn VersionRepository>,
        builds: Arc<dyn BuildRepository>,
        queue: Arc<dyn BuildQueue>,
        callback: CallbackParams,
    ) -> Self {
        Self {
            packages,
            versions,
            builds,
            queue,
            callback,
        }
    }

    /// Submit every missing cell of a package.
    ///
    /// Each cell is claimed with a `triggered` placeholder before the CI
    /// call is made. A cell someone else already claimed is skipped. A
    /// failed CI call leaves its placeholder for the trimmer.
    pub async fn submit(
        &self,
        package_id: PackageId,
        missing: &[MissingBuilds],
    ) -> Result<SubmissionReport> {
        let package = self
            .packages
            .get(package_id)
            .await?
            .ok_or_else(|| Error::PackageNotFound(package_id.to_string()))?;

        let mut report = SubmissionReport::default();
        let mut cells = Vec::new();
        for entry in missing {
            let reference = match self.versions.get(entry.version_id).await? {
                Some(version) => version.reference,
                None => {
                    warn!(version_id = %entry.version_id, "Version vanished before submission");
                    report.skipped += entry.pairs.len() as u64;
                    continue;
                }
            };
            let Some(reference) = reference else {
                warn!(
                    %package_id,
                    version_id = %entry.version_id,
                    "Version has no reference, skipping"
                );
                report.skipped += entry.pairs.len() as u64;
                continue;
            };
            for pair in &entry.pairs {
                cells.push(self.submit_cell(
                    entry.version_id,
                    &package.url,
                    reference.clone(),
                    *pair,
                ));
            }
        }

        for outcome in join_all(cells).await {
            report.record(outcome);
        }
        debug!(
            %package_id,
            triggered = report.triggered,
            conflicts = report.conflicts,
            failed = report.failed,
            skipped = report.skipped,
            "Package submitted"
        );
        Ok(report)
    }

    async fn submit_cell(
        &self,
        version_id: VersionId,
        clone_url: &PackageUrl,
        reference: Reference,
        pair: BuildPair,
    ) -> CellOutcome {
        let placeholder = BuildCell::placeholder(version_id, pair);
        match self.builds.create(&placeholder).await {
            Ok(_) => {}
            Err(Error::DuplicateBuild { .. }) => {
                debug!(%version_id, %pair, "Cell already claimed");
                return CellOutcome::Conflict;
            }
            Err(e) => {
                error!(%version_id, %pair, error = %e, "Failed to claim cell");
                return CellOutcome::Failed;
            }
        }

        let job = BuildJob {
            version_id,
            clone_url: clone_url.clone(),
            reference,
            platform: pair.platform,
            toolchain: pair.toolchain,
            callback: self.callback.clone(),
        };
        let triggered = match self.queue.trigger(&job).await {
            Ok(triggered) => triggered,
            Err(e) => {
                error!(%version_id, %pair, error = %e, "Trigger failed, placeholder kept");
                return CellOutcome::Failed;
            }
        };

        if let Some(web_url) = triggered.web_url {
            if let Err(e) = self.builds.set_job_url(placeholder.id, &web_url).await {
                warn!(build_id = %placeholder.id, error = %e, "Failed to record job URL");
            }
        }
        CellOutcome::Triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockQueue, seed_builds, seed_default_branch, seed_package, seed_version};
    use pkgmatrix_core::build::{BuildStatus, Platform, ToolchainVersion};
    use pkgmatrix_core::matrix::Matrix;
    use pkgmatrix_core::version::Channel;
    use pkgmatrix_db::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn submitter(store: &Arc<MemoryStore>, queue: &Arc<MockQueue>) -> BuildSubmitter {
        BuildSubmitter::new(
            store.clone(),
            store.clone(),
            store.clone(),
            queue.clone(),
            CallbackParams::new("http://example.com/api", "builder-token"),
        )
    }

    fn single(version_id: VersionId, pair: BuildPair) -> MissingBuilds {
        MissingBuilds::new(version_id, BTreeSet::from([pair]))
    }

    #[tokio::test]
    async fn test_submit_claims_and_triggers_every_cell() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MockQueue::default());
        let (package, version) = seed_default_branch(&store, "https://github.com/foo/bar").await;
        let missing = vec![MissingBuilds::new(version.id, Matrix::active().cells())];

        let report = submitter(&store, &queue)
            .submit(package.id, &missing)
            .await
            .unwrap();

        assert_eq!(
            report,
            SubmissionReport {
                triggered: 25,
                ..Default::default()
            }
        );
        let builds = store.builds().unwrap();
        assert_eq!(builds.len(), 25);
        assert!(builds.iter().all(|b| b.status == BuildStatus::Triggered));
        assert!(builds.iter().all(|b| b.job_url.is_some()));

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 25);
        assert!(jobs.iter().all(|j| j.clone_url == package.url));
        assert!(jobs.iter().all(|j| j.reference.name() == "main"));
        assert!(jobs.iter().all(|j| j.callback.builder_token == "builder-token"));
    }

    #[tokio::test]
    async fn test_existing_cell_is_skipped_silently() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MockQueue::default());
        let (package, version) = seed_default_branch(&store, "https://x.com/1").await;
        let pair = BuildPair::new(Platform::Ios, ToolchainVersion::V5_4);
        seed_builds(&store, version.id, [pair], BuildStatus::Ok).await;

        let report = submitter(&store, &queue)
            .submit(package.id, &[single(version.id, pair)])
            .await
            .unwrap();

        assert_eq!(report.conflicts, 1);
        assert_eq!(report.triggered, 0);
        assert!(queue.jobs().is_empty());
        assert_eq!(store.builds().unwrap()[0].status, BuildStatus::Ok);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_claim_cell_once() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MockQueue::default());
        let (package, version) = seed_default_branch(&store, "https://x.com/1").await;
        let missing = vec![single(
            version.id,
            BuildPair::new(Platform::Linux, ToolchainVersion::V5_5),
        )];
        let submitter = submitter(&store, &queue);

        let (a, b) = tokio::join!(
            submitter.submit(package.id, &missing),
            submitter.submit(package.id, &missing),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.triggered + b.triggered, 1);
        assert_eq!(a.conflicts + b.conflicts, 1);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(queue.jobs().len(), 1);
    }

    #[tokio::test]
    async fn test_trigger_failure_keeps_placeholder() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MockQueue {
            fail_triggers: true,
            ..Default::default()
        });
        let (package, version) = seed_default_branch(&store, "https://x.com/1").await;
        let pairs: BTreeSet<BuildPair> = [Platform::Ios, Platform::Linux]
            .into_iter()
            .map(|p| BuildPair::new(p, ToolchainVersion::V5_5))
            .collect();

        let report = submitter(&store, &queue)
            .submit(package.id, &[MissingBuilds::new(version.id, pairs)])
            .await
            .unwrap();

        assert_eq!(report.failed, 2);
        let builds = store.builds().unwrap();
        assert_eq!(builds.len(), 2);
        assert!(builds.iter().all(|b| b.status == BuildStatus::Triggered));
        assert!(builds.iter().all(|b| b.job_url.is_none()));
    }

    #[tokio::test]
    async fn test_version_without_reference_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MockQueue::default());
        let package = seed_package(&store, "https://x.com/1").await;
        let version = seed_version(&store, &package, None, Some(Channel::Release)).await;

        let report = submitter(&store, &queue)
            .submit(
                package.id,
                &[MissingBuilds::new(version.id, Matrix::active().cells())],
            )
            .await
            .unwrap();

        assert_eq!(report.skipped, 25);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_package_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MockQueue::default());

        let result = submitter(&store, &queue).submit(PackageId::new(), &[]).await;

        assert!(matches!(result, Err(Error::PackageNotFound(_))));
    }
}
