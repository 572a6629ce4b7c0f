//! Build cells: one record per (version, platform, toolchain) triple.

use crate::ids::{BuildId, VersionId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Target platform a build runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Ios,
    MacosSpm,
    MacosXcodebuild,
    Linux,
    Watchos,
    Tvos,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Ios,
        Platform::MacosSpm,
        Platform::MacosXcodebuild,
        Platform::Linux,
        Platform::Watchos,
        Platform::Tvos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::MacosSpm => "macos-spm",
            Platform::MacosXcodebuild => "macos-xcodebuild",
            Platform::Linux => "linux",
            Platform::Watchos => "watchos",
            Platform::Tvos => "tvos",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownPlatform(s.to_string()))
    }
}

/// Toolchain release a build is compiled with, e.g. `5.5.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolchainVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ToolchainVersion {
    pub const V5_1: ToolchainVersion = ToolchainVersion::new(5, 1, 5);
    pub const V5_2: ToolchainVersion = ToolchainVersion::new(5, 2, 4);
    pub const V5_3: ToolchainVersion = ToolchainVersion::new(5, 3, 3);
    pub const V5_4: ToolchainVersion = ToolchainVersion::new(5, 4, 0);
    pub const V5_5: ToolchainVersion = ToolchainVersion::new(5, 5, 0);

    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for ToolchainVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(Error::UnknownToolchain(s.to_string()));
        };
        let parse = |part: &str| {
            part.parse::<u16>()
                .map_err(|_| Error::UnknownToolchain(s.to_string()))
        };
        Ok(Self::new(parse(*major)?, parse(*minor)?, parse(*patch)?))
    }
}

impl TryFrom<String> for ToolchainVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ToolchainVersion> for String {
    fn from(version: ToolchainVersion) -> Self {
        version.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Triggered,
    Pending,
    Ok,
    Failed,
    Timeout,
    InfrastructureError,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Triggered => "triggered",
            BuildStatus::Pending => "pending",
            BuildStatus::Ok => "ok",
            BuildStatus::Failed => "failed",
            BuildStatus::Timeout => "timeout",
            BuildStatus::InfrastructureError => "infrastructure_error",
        }
    }
}

impl std::str::FromStr for BuildStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "triggered" => Ok(BuildStatus::Triggered),
            "pending" => Ok(BuildStatus::Pending),
            "ok" => Ok(BuildStatus::Ok),
            "failed" => Ok(BuildStatus::Failed),
            "timeout" => Ok(BuildStatus::Timeout),
            "infrastructure_error" => Ok(BuildStatus::InfrastructureError),
            other => Err(Error::UnknownBuildStatus(other.to_string())),
        }
    }
}

/// One (platform, toolchain) cell of the build matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildPair {
    pub platform: Platform,
    pub toolchain: ToolchainVersion,
}

impl BuildPair {
    pub fn new(platform: Platform, toolchain: ToolchainVersion) -> Self {
        Self {
            platform,
            toolchain,
        }
    }
}

impl fmt::Display for BuildPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.toolchain)
    }
}

/// Matrix cells still missing for one significant version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingBuilds {
    pub version_id: VersionId,
    pub pairs: BTreeSet<BuildPair>,
}

impl MissingBuilds {
    pub fn new(version_id: VersionId, pairs: BTreeSet<BuildPair>) -> Self {
        Self { version_id, pairs }
    }
}

/// Placeholder or result record for one matrix cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildCell {
    pub id: BuildId,
    pub version_id: VersionId,
    pub platform: Platform,
    pub toolchain: ToolchainVersion,
    pub status: BuildStatus,
    pub job_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BuildCell {
    pub fn new(version_id: VersionId, pair: BuildPair, status: BuildStatus) -> Self {
        Self {
            id: BuildId::new(),
            version_id,
            platform: pair.platform,
            toolchain: pair.toolchain,
            status,
            job_url: None,
            created_at: Utc::now(),
        }
    }

    /// Claims a cell before the CI system is asked to build it.
    pub fn placeholder(version_id: VersionId, pair: BuildPair) -> Self {
        Self::new(version_id, pair, BuildStatus::Triggered)
    }

    pub fn pair(&self) -> BuildPair {
        BuildPair::new(self.platform, self.toolchain)
    }
}
