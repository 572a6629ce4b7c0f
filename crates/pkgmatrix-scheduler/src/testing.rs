//! Mock ports and seeding helpers shared by the unit tests.

use async_trait::async_trait;
use pkgmatrix_core::build::{BuildCell, BuildPair, BuildStatus};
use pkgmatrix_core::ids::VersionId;
use pkgmatrix_core::package::{PackageUrl, TrackedPackage};
use pkgmatrix_core::ports::{
    BuildJob, BuildQueue, BuildRepository, CycleReport, MetricsSink, PackageListSource,
    PackageRepository, ReconcileReport, TriggeredJob, VersionRepository,
};
use pkgmatrix_core::version::{Channel, Reference, Version};
use pkgmatrix_core::{Error, Result};
use pkgmatrix_db::MemoryStore;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct MockQueue {
    pub occupancy: u64,
    pub fail_occupancy: bool,
    pub fail_triggers: bool,
    pub occupancy_calls: AtomicUsize,
    pub jobs: Mutex<Vec<BuildJob>>,
}

impl MockQueue {
    pub fn with_occupancy(occupancy: u64) -> Self {
        Self {
            occupancy,
            ..Default::default()
        }
    }

    pub fn jobs(&self) -> Vec<BuildJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildQueue for MockQueue {
    async fn occupancy(&self) -> Result<u64> {
        self.occupancy_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_occupancy {
            return Err(Error::Network("connection refused".to_string()));
        }
        Ok(self.occupancy)
    }

    async fn trigger(&self, job: &BuildJob) -> Result<TriggeredJob> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job.clone());
        if self.fail_triggers {
            return Err(Error::Network("connection reset".to_string()));
        }
        Ok(TriggeredJob {
            web_url: Some(format!("https://ci.example.com/pipelines/{}", jobs.len())),
        })
    }
}

/// Package listing returning a canned response; `None` fails the fetch.
pub struct MockSource {
    pub urls: Option<Vec<String>>,
}

impl MockSource {
    pub fn ok(urls: &[&str]) -> Self {
        Self {
            urls: Some(urls.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { urls: None }
    }
}

#[async_trait]
impl PackageListSource for MockSource {
    async fn fetch(&self) -> Result<Vec<String>> {
        self.urls
            .clone()
            .ok_or_else(|| Error::Decode("unexpected token".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub reconciles: Mutex<Vec<Option<ReconcileReport>>>,
    pub cycles: Mutex<Vec<Option<CycleReport>>>,
}

impl MetricsSink for RecordingMetrics {
    fn record_reconcile(&self, _duration: Duration, outcome: Option<&ReconcileReport>) {
        self.reconciles.lock().unwrap().push(outcome.cloned());
    }

    fn record_trigger_cycle(&self, _duration: Duration, outcome: Option<&CycleReport>) {
        self.cycles.lock().unwrap().push(outcome.cloned());
    }
}

pub async fn seed_package(store: &MemoryStore, url: &str) -> TrackedPackage {
    let package = TrackedPackage::new(PackageUrl::parse(url).unwrap());
    store.insert_many(&[package.clone()]).await.unwrap();
    package
}

pub async fn seed_version(
    store: &MemoryStore,
    package: &TrackedPackage,
    reference: Option<Reference>,
    latest: Option<Channel>,
) -> Version {
    let version = Version::new(package.id, reference, latest);
    VersionRepository::create(store, &version).await.unwrap();
    version
}

/// A package with one significant default-branch version.
pub async fn seed_default_branch(store: &MemoryStore, url: &str) -> (TrackedPackage, Version) {
    let package = seed_package(store, url).await;
    let version = seed_version(
        store,
        &package,
        Some(Reference::Branch("main".to_string())),
        Some(Channel::DefaultBranch),
    )
    .await;
    (package, version)
}

pub async fn seed_builds<I>(store: &MemoryStore, version_id: VersionId, pairs: I, status: BuildStatus)
where
    I: IntoIterator<Item = BuildPair>,
{
    for pair in pairs {
        BuildRepository::create(store, &BuildCell::new(version_id, pair, status))
            .await
            .unwrap();
    }
}
