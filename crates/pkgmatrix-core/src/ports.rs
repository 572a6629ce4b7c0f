//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the scheduling core and the
//! store, CI and listing adapters.

use crate::build::{BuildCell, Platform, ToolchainVersion};
use crate::ids::*;
use crate::matrix::Matrix;
use crate::package::{PackageUrl, TrackedPackage};
use crate::settings::CallbackParams;
use crate::version::{Reference, Version};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source of truth for which packages should be tracked.
#[async_trait]
pub trait PackageListSource: Send + Sync {
    /// Fetch the raw package URLs, in listing order.
    async fn fetch(&self) -> Result<Vec<String>>;
}

/// Repository for tracked packages.
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// Insert packages, skipping any whose URL is already tracked.
    /// Returns the number of rows actually inserted.
    async fn insert_many(&self, packages: &[TrackedPackage]) -> Result<u64>;

    /// Get a package by ID.
    async fn get(&self, id: PackageId) -> Result<Option<TrackedPackage>>;

    /// URLs of all tracked packages, as stored.
    async fn list_urls(&self) -> Result<Vec<String>>;

    /// Delete the package tracked under `url`. Returns the number of rows removed.
    async fn delete_by_url(&self, url: &PackageUrl) -> Result<u64>;
}

/// Repository for package versions.
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Create a version.
    async fn create(&self, version: &Version) -> Result<VersionId>;

    /// Get a version by ID.
    async fn get(&self, id: VersionId) -> Result<Option<Version>>;

    /// Versions of a package that carry a release channel.
    async fn list_significant(&self, package_id: PackageId) -> Result<Vec<Version>>;
}

/// Repository for build cells.
#[async_trait]
pub trait BuildRepository: Send + Sync {
    /// Create a build cell.
    ///
    /// Fails with [`crate::Error::DuplicateBuild`] when a cell for the same
    /// (version, platform, toolchain) triple already exists.
    async fn create(&self, build: &BuildCell) -> Result<BuildId>;

    /// All cells recorded for a version.
    async fn list_for_version(&self, version_id: VersionId) -> Result<Vec<BuildCell>>;

    /// Record the CI job URL of a triggered cell.
    async fn set_job_url(&self, id: BuildId, job_url: &str) -> Result<()>;

    /// Packages with at least one buildable version missing a cell of
    /// `matrix`, oldest package first. Versions without a reference never
    /// make a package a candidate.
    async fn build_candidates(&self, matrix: &Matrix, limit: u32) -> Result<Vec<PackageId>>;

    /// Delete every cell of insignificant versions, and `pending` cells of
    /// significant versions created before `cutoff`. Returns the number deleted.
    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Total number of cells.
    async fn count(&self) -> Result<u64>;
}

/// Everything the CI system needs to build one matrix cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildJob {
    pub version_id: VersionId,
    pub clone_url: PackageUrl,
    pub reference: Reference,
    pub platform: Platform,
    pub toolchain: ToolchainVersion,
    pub callback: CallbackParams,
}

/// Acknowledgement returned by the CI system for a submitted job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggeredJob {
    pub web_url: Option<String>,
}

/// External CI system that runs builds.
#[async_trait]
pub trait BuildQueue: Send + Sync {
    /// Number of jobs currently queued or running.
    async fn occupancy(&self) -> Result<u64>;

    /// Submit a build job.
    async fn trigger(&self, job: &BuildJob) -> Result<TriggeredJob>;
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub added: u64,
    pub deleted: u64,
}

/// Outcome of one trigger cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub trimmed: u64,
    pub candidates: u64,
    pub admitted: u64,
    pub rejected_disabled: u64,
    pub rejected_capacity: u64,
    pub rejected_downscaled: u64,
    /// Packages skipped because the occupancy query failed.
    pub gate_errors: u64,
    /// Admitted packages whose planning or submission failed outright.
    pub package_errors: u64,
    pub triggered: u64,
    pub conflicts: u64,
    pub failed: u64,
    pub skipped: u64,
    pub cancelled: bool,
}

/// Receiver of scheduler telemetry. Implementations must not block.
pub trait MetricsSink: Send + Sync {
    fn record_reconcile(&self, duration: Duration, outcome: Option<&ReconcileReport>);

    fn record_trigger_cycle(&self, duration: Duration, outcome: Option<&CycleReport>);
}
