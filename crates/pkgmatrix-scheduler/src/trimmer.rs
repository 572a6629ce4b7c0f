//! Reclaims build records that no longer count towards the matrix.

use crate::context::Clock;
use pkgmatrix_core::Result;
use pkgmatrix_core::ports::BuildRepository;
use std::sync::Arc;
use tracing::info;

pub struct BuildTrimmer {
    builds: Arc<dyn BuildRepository>,
    clock: Arc<dyn Clock>,
    stale_after: chrono::Duration,
}

impl BuildTrimmer {
    pub fn new(
        builds: Arc<dyn BuildRepository>,
        clock: Arc<dyn Clock>,
        stale_after: chrono::Duration,
    ) -> Self {
        Self {
            builds,
            clock,
            stale_after,
        }
    }

    /// Delete all cells of insignificant versions and the `pending` cells of
    /// significant versions older than the staleness threshold.
    pub async fn trim_builds(&self) -> Result<u64> {
        let cutoff = self.clock.now() - self.stale_after;
        let deleted = self.builds.delete_stale(cutoff).await?;
        if deleted > 0 {
            info!(deleted, %cutoff, "Trimmed build records");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FixedClock;
    use crate::testing::{seed_default_branch, seed_version};
    use chrono::{Duration, Utc};
    use pkgmatrix_core::build::{BuildCell, BuildPair, BuildStatus, Platform, ToolchainVersion};
    use pkgmatrix_core::ids::VersionId;
    use pkgmatrix_core::version::Reference;
    use pkgmatrix_db::MemoryStore;

    async fn seed_cell(
        store: &MemoryStore,
        version_id: VersionId,
        platform: Platform,
        status: BuildStatus,
        age: Duration,
        now: chrono::DateTime<Utc>,
    ) -> BuildCell {
        let cell = BuildCell {
            created_at: now - age,
            ..BuildCell::new(
                version_id,
                BuildPair::new(platform, ToolchainVersion::V5_5),
                status,
            )
        };
        BuildRepository::create(store, &cell).await.unwrap();
        cell
    }

    #[tokio::test]
    async fn test_trim_rules() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let (package, significant) = seed_default_branch(&store, "https://x.com/1").await;
        let insignificant =
            seed_version(&store, &package, Some(Reference::Tag("0.9.0".into())), None).await;

        let fresh_pending = seed_cell(
            &store,
            significant.id,
            Platform::Ios,
            BuildStatus::Pending,
            Duration::minutes(5),
            now,
        )
        .await;
        let old_finished = seed_cell(
            &store,
            significant.id,
            Platform::Linux,
            BuildStatus::Ok,
            Duration::hours(4),
            now,
        )
        .await;
        let old_triggered = seed_cell(
            &store,
            significant.id,
            Platform::Watchos,
            BuildStatus::Triggered,
            Duration::hours(4),
            now,
        )
        .await;
        seed_cell(
            &store,
            significant.id,
            Platform::MacosSpm,
            BuildStatus::Pending,
            Duration::hours(4),
            now,
        )
        .await;
        for (platform, status) in [
            (Platform::Ios, BuildStatus::Ok),
            (Platform::Linux, BuildStatus::Pending),
        ] {
            seed_cell(&store, insignificant.id, platform, status, Duration::minutes(1), now).await;
        }

        let trimmer = BuildTrimmer::new(store.clone(), Arc::new(FixedClock(now)), Duration::hours(3));
        let deleted = trimmer.trim_builds().await.unwrap();

        assert_eq!(deleted, 3);
        let mut remaining: Vec<_> = store.builds().unwrap().iter().map(|b| b.id).collect();
        remaining.sort();
        let mut expected = vec![fresh_pending.id, old_finished.id, old_triggered.id];
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[tokio::test]
    async fn test_threshold_follows_clock() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let (_, version) = seed_default_branch(&store, "https://x.com/1").await;
        seed_cell(
            &store,
            version.id,
            Platform::Ios,
            BuildStatus::Pending,
            Duration::hours(2),
            now,
        )
        .await;

        let same_time =
            BuildTrimmer::new(store.clone(), Arc::new(FixedClock(now)), Duration::hours(3));
        assert_eq!(same_time.trim_builds().await.unwrap(), 0);

        let later = BuildTrimmer::new(
            store.clone(),
            Arc::new(FixedClock(now + Duration::hours(2))),
            Duration::hours(3),
        );
        assert_eq!(later.trim_builds().await.unwrap(), 1);
    }
}
