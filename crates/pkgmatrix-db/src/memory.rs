//! In-memory store with the same semantics as the PostgreSQL repositories.
//!
//! Packages, versions and builds live in insertion order behind one mutex,
//! so every operation is atomic with respect to the others. Deleting a
//! package cascades to its versions and their builds, and the
//! (version, platform, toolchain) uniqueness of builds is enforced on insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pkgmatrix_core::build::{BuildCell, BuildStatus};
use pkgmatrix_core::ids::{BuildId, PackageId, VersionId};
use pkgmatrix_core::matrix::Matrix;
use pkgmatrix_core::package::{PackageUrl, TrackedPackage};
use pkgmatrix_core::ports::{BuildRepository, PackageRepository, VersionRepository};
use pkgmatrix_core::version::Version;
use pkgmatrix_core::{Error, Result};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    packages: Vec<TrackedPackage>,
    versions: Vec<Version>,
    builds: Vec<BuildCell>,
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))
    }

    /// Snapshot of all tracked packages.
    pub fn packages(&self) -> Result<Vec<TrackedPackage>> {
        Ok(self.lock()?.packages.clone())
    }

    /// Snapshot of all build cells.
    pub fn builds(&self) -> Result<Vec<BuildCell>> {
        Ok(self.lock()?.builds.clone())
    }
}

fn same_package(stored: &PackageUrl, url: &PackageUrl) -> bool {
    stored == url
}

#[async_trait]
impl PackageRepository for MemoryStore {
    async fn insert_many(&self, packages: &[TrackedPackage]) -> Result<u64> {
        let mut state = self.lock()?;
        let mut inserted = 0;
        for package in packages {
            if state.packages.iter().any(|p| same_package(&p.url, &package.url)) {
                continue;
            }
            state.packages.push(package.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn get(&self, id: PackageId) -> Result<Option<TrackedPackage>> {
        Ok(self.lock()?.packages.iter().find(|p| p.id == id).cloned())
    }

    async fn list_urls(&self) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .packages
            .iter()
            .map(|p| p.url.to_string())
            .collect())
    }

    async fn delete_by_url(&self, url: &PackageUrl) -> Result<u64> {
        let mut state = self.lock()?;
        let removed: HashSet<PackageId> = state
            .packages
            .iter()
            .filter(|p| same_package(&p.url, url))
            .map(|p| p.id)
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }

        state.packages.retain(|p| !removed.contains(&p.id));
        let dropped_versions: HashSet<VersionId> = state
            .versions
            .iter()
            .filter(|v| removed.contains(&v.package_id))
            .map(|v| v.id)
            .collect();
        state.versions.retain(|v| !dropped_versions.contains(&v.id));
        state
            .builds
            .retain(|b| !dropped_versions.contains(&b.version_id));

        Ok(removed.len() as u64)
    }
}

#[async_trait]
impl VersionRepository for MemoryStore {
    async fn create(&self, version: &Version) -> Result<VersionId> {
        let mut state = self.lock()?;
        if !state.packages.iter().any(|p| p.id == version.package_id) {
            return Err(Error::PackageNotFound(version.package_id.to_string()));
        }
        state.versions.push(version.clone());
        Ok(version.id)
    }

    async fn get(&self, id: VersionId) -> Result<Option<Version>> {
        Ok(self.lock()?.versions.iter().find(|v| v.id == id).cloned())
    }

    async fn list_significant(&self, package_id: PackageId) -> Result<Vec<Version>> {
        let state = self.lock()?;
        let mut versions: Vec<Version> = state
            .versions
            .iter()
            .filter(|v| v.package_id == package_id && v.is_significant())
            .cloned()
            .collect();
        versions.sort_by_key(|v| (v.created_at, v.id));
        Ok(versions)
    }
}

#[async_trait]
impl BuildRepository for MemoryStore {
    async fn create(&self, build: &BuildCell) -> Result<BuildId> {
        let mut state = self.lock()?;
        if !state.versions.iter().any(|v| v.id == build.version_id) {
            return Err(Error::VersionNotFound(build.version_id.to_string()));
        }
        let taken = state.builds.iter().any(|b| {
            b.version_id == build.version_id
                && b.platform == build.platform
                && b.toolchain == build.toolchain
        });
        if taken {
            return Err(Error::DuplicateBuild {
                version_id: build.version_id,
                platform: build.platform,
                toolchain: build.toolchain,
            });
        }
        state.builds.push(build.clone());
        Ok(build.id)
    }

    async fn list_for_version(&self, version_id: VersionId) -> Result<Vec<BuildCell>> {
        let state = self.lock()?;
        let mut builds: Vec<BuildCell> = state
            .builds
            .iter()
            .filter(|b| b.version_id == version_id)
            .cloned()
            .collect();
        builds.sort_by_key(|b| (b.created_at, b.id));
        Ok(builds)
    }

    async fn set_job_url(&self, id: BuildId, job_url: &str) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(build) = state.builds.iter_mut().find(|b| b.id == id) {
            build.job_url = Some(job_url.to_string());
        }
        Ok(())
    }

    async fn build_candidates(&self, matrix: &Matrix, limit: u32) -> Result<Vec<PackageId>> {
        let state = self.lock()?;
        let incomplete = |version: &Version| {
            let built = state
                .builds
                .iter()
                .filter(|b| b.version_id == version.id && matrix.contains(&b.pair()))
                .count();
            built < matrix.len()
        };

        let mut packages: Vec<&TrackedPackage> = state
            .packages
            .iter()
            .filter(|p| {
                state
                    .versions
                    .iter()
                    .any(|v| v.package_id == p.id && v.is_buildable() && incomplete(v))
            })
            .collect();
        packages.sort_by_key(|p| (p.created_at, p.id));

        Ok(packages
            .into_iter()
            .take(limit as usize)
            .map(|p| p.id)
            .collect())
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let insignificant: HashSet<VersionId> = state
            .versions
            .iter()
            .filter(|v| !v.is_significant())
            .map(|v| v.id)
            .collect();

        let before = state.builds.len();
        state.builds.retain(|b| {
            let stale_pending = b.status == BuildStatus::Pending && b.created_at < cutoff;
            !(insignificant.contains(&b.version_id) || stale_pending)
        });
        Ok((before - state.builds.len()) as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.lock()?.builds.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pkgmatrix_core::build::{BuildPair, Platform, ToolchainVersion};
    use pkgmatrix_core::version::{Channel, Reference};

    fn url(s: &str) -> PackageUrl {
        PackageUrl::parse(s).unwrap()
    }

    async fn seed_package(store: &MemoryStore, s: &str) -> TrackedPackage {
        let package = TrackedPackage::new(url(s));
        store.insert_many(&[package.clone()]).await.unwrap();
        package
    }

    #[tokio::test]
    async fn test_insert_many_skips_known_urls() {
        let store = MemoryStore::new();
        seed_package(&store, "https://example.com/a").await;

        let inserted = store
            .insert_many(&[
                TrackedPackage::new(url("https://EXAMPLE.com/a/")),
                TrackedPackage::new(url("https://example.com/b")),
            ])
            .await
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(store.list_urls().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_builds() {
        let store = MemoryStore::new();
        let package = seed_package(&store, "https://example.com/a").await;
        let version = Version::new(
            package.id,
            Some(Reference::Branch("main".into())),
            Some(Channel::DefaultBranch),
        );
        VersionRepository::create(&store, &version).await.unwrap();
        BuildRepository::create(
            &store,
            &BuildCell::placeholder(
                version.id,
                BuildPair::new(Platform::Ios, ToolchainVersion::V5_5),
            ),
        )
        .await
        .unwrap();

        let removed = store.delete_by_url(&package.url).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(VersionRepository::get(&store, version.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_cell_rejected() {
        let store = MemoryStore::new();
        let package = seed_package(&store, "https://example.com/a").await;
        let version = Version::new(package.id, None, Some(Channel::Release));
        VersionRepository::create(&store, &version).await.unwrap();
        let pair = BuildPair::new(Platform::Linux, ToolchainVersion::V5_4);

        BuildRepository::create(&store, &BuildCell::placeholder(version.id, pair))
            .await
            .unwrap();
        let second =
            BuildRepository::create(&store, &BuildCell::placeholder(version.id, pair)).await;

        assert!(matches!(second, Err(Error::DuplicateBuild { .. })));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_stale_rules() {
        let store = MemoryStore::new();
        let package = seed_package(&store, "https://example.com/a").await;
        let significant = Version::new(package.id, None, Some(Channel::DefaultBranch));
        let insignificant = Version::new(package.id, None, None);
        VersionRepository::create(&store, &significant).await.unwrap();
        VersionRepository::create(&store, &insignificant).await.unwrap();

        let now = Utc::now();
        let old = now - Duration::hours(4);
        let cell = |version: VersionId, toolchain, status, created_at| BuildCell {
            created_at,
            ..BuildCell::new(version, BuildPair::new(Platform::Ios, toolchain), status)
        };
        let keep_new = cell(significant.id, ToolchainVersion::V5_2, BuildStatus::Pending, now);
        let keep_done = cell(significant.id, ToolchainVersion::V5_3, BuildStatus::Ok, old);
        for build in [
            cell(significant.id, ToolchainVersion::V5_1, BuildStatus::Pending, old),
            keep_new.clone(),
            keep_done.clone(),
            cell(insignificant.id, ToolchainVersion::V5_1, BuildStatus::Pending, old),
            cell(insignificant.id, ToolchainVersion::V5_2, BuildStatus::Pending, now),
            cell(insignificant.id, ToolchainVersion::V5_3, BuildStatus::Ok, old),
        ] {
            BuildRepository::create(&store, &build).await.unwrap();
        }

        let deleted = store.delete_stale(now - Duration::hours(3)).await.unwrap();

        assert_eq!(deleted, 4);
        let remaining: Vec<BuildId> = store.builds().unwrap().iter().map(|b| b.id).collect();
        assert_eq!(remaining, vec![keep_new.id, keep_done.id]);
    }
}
