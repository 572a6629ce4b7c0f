//! Works out which matrix cells are still missing.

use pkgmatrix_core::Result;
use pkgmatrix_core::build::MissingBuilds;
use pkgmatrix_core::ids::PackageId;
use pkgmatrix_core::matrix::Matrix;
use pkgmatrix_core::ports::{BuildRepository, VersionRepository};
use std::sync::Arc;
use tracing::debug;

pub struct BuildPlanner {
    versions: Arc<dyn VersionRepository>,
    builds: Arc<dyn BuildRepository>,
    matrix: Matrix,
}

impl BuildPlanner {
    pub fn new(
        versions: Arc<dyn VersionRepository>,
        builds: Arc<dyn BuildRepository>,
        matrix: Matrix,
    ) -> Self {
        Self {
            versions,
            builds,
            matrix,
        }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Up to `limit` packages with a buildable version missing at least
    /// one cell, oldest package first.
    pub async fn fetch_build_candidates(&self, limit: u32) -> Result<Vec<PackageId>> {
        let candidates = self.builds.build_candidates(&self.matrix, limit).await?;
        debug!(limit, found = candidates.len(), "Fetched build candidates");
        Ok(candidates)
    }

    /// Missing cells per significant version of a package. Complete
    /// versions, and versions without a reference, are left out.
    pub async fn find_missing_builds(&self, package_id: PackageId) -> Result<Vec<MissingBuilds>> {
        let versions = self.versions.list_significant(package_id).await?;

        let mut missing = Vec::new();
        for version in versions {
            if !version.is_buildable() {
                debug!(%package_id, version_id = %version.id, "No reference, nothing to build");
                continue;
            }
            let existing = self.builds.list_for_version(version.id).await?;
            let pairs = self.matrix.missing(existing.iter().map(|b| b.pair()));
            if !pairs.is_empty() {
                missing.push(MissingBuilds::new(version.id, pairs));
            }
        }
        Ok(missing)
    }
}
