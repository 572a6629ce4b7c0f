//! Error types for pkgmatrix.

use crate::build::{Platform, ToolchainVersion};
use crate::ids::VersionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Package errors
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid package URL: {0}")]
    InvalidPackageUrl(String),

    // Version errors
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    // Build errors
    #[error("Build already exists for {version_id} on {platform} with {toolchain}")]
    DuplicateBuild {
        version_id: VersionId,
        platform: Platform,
        toolchain: ToolchainVersion,
    },

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown toolchain version: {0}")]
    UnknownToolchain(String),

    #[error("Unknown build status: {0}")]
    UnknownBuildStatus(String),

    // Scheduling errors
    #[error("A trigger cycle is already running")]
    CycleInProgress,

    #[error("Trigger request rejected by CI: {0}")]
    TriggerRejected(String),

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_build_names_the_cell() {
        let version_id = VersionId::new();
        let err = Error::DuplicateBuild {
            version_id,
            platform: Platform::Watchos,
            toolchain: ToolchainVersion::V5_5,
        };
        assert_eq!(
            err.to_string(),
            format!("Build already exists for {} on watchos with 5.5.0", version_id)
        );
    }
}
