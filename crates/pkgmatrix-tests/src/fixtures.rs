//! Test fixtures for creating sample data.

use chrono::{DateTime, Duration, Utc};
use pkgmatrix_core::build::{BuildCell, BuildPair, BuildStatus, Platform};
use pkgmatrix_core::matrix::Matrix;
use pkgmatrix_core::package::{PackageUrl, TrackedPackage};
use pkgmatrix_core::version::{Channel, Reference, Version};

/// Factory for tracked packages.
pub struct PackageFixture;

impl PackageFixture {
    pub fn tracked(url: &str) -> TrackedPackage {
        TrackedPackage::new(PackageUrl::parse(url).expect("valid fixture URL"))
    }
}

/// Factory for package versions.
pub struct VersionFixture;

impl VersionFixture {
    /// Significant version on the default branch `main`.
    pub fn default_branch(package: &TrackedPackage) -> Version {
        Version::new(
            package.id,
            Some(Reference::Branch("main".to_string())),
            Some(Channel::DefaultBranch),
        )
    }

    /// Significant tagged release.
    pub fn release(package: &TrackedPackage, tag: &str) -> Version {
        Version::new(
            package.id,
            Some(Reference::Tag(tag.to_string())),
            Some(Channel::Release),
        )
    }

    /// Release with no branch or tag to check out.
    pub fn unreferenced(package: &TrackedPackage) -> Version {
        Version::new(package.id, None, Some(Channel::Release))
    }

    /// Tag that is no longer the latest of any channel.
    pub fn superseded(package: &TrackedPackage, tag: &str) -> Version {
        Version::new(package.id, Some(Reference::Tag(tag.to_string())), None)
    }
}

/// Factory for build cells.
pub struct BuildFixture;

impl BuildFixture {
    pub fn cell(version: &Version, pair: BuildPair, status: BuildStatus) -> BuildCell {
        BuildCell::new(version.id, pair, status)
    }

    /// Cell created `age` before `now`.
    pub fn aged(
        version: &Version,
        pair: BuildPair,
        status: BuildStatus,
        age: Duration,
        now: DateTime<Utc>,
    ) -> BuildCell {
        BuildCell {
            created_at: now - age,
            ..Self::cell(version, pair, status)
        }
    }

    /// Every active cell except those on `platform`.
    pub fn all_but_platform(version: &Version, platform: Platform, status: BuildStatus) -> Vec<BuildCell> {
        Matrix::active()
            .cells()
            .into_iter()
            .filter(|pair| pair.platform != platform)
            .map(|pair| Self::cell(version, pair, status))
            .collect()
    }
}
