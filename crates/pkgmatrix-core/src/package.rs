//! Tracked packages and their canonical source URLs.

use crate::ids::PackageId;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Canonical source URL of a package.
///
/// Two listings that spell the same repository with different case or a
/// trailing slash resolve to the same `PackageUrl`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageUrl(String);

impl PackageUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let parsed = Url::parse(trimmed)
            .map_err(|e| Error::InvalidPackageUrl(format!("{}: {}", trimmed, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidPackageUrl(format!(
                "{}: unsupported scheme {}",
                trimmed,
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(Error::InvalidPackageUrl(format!("{}: missing host", trimmed)));
        }

        let canonical = parsed.as_str().trim_end_matches('/').to_lowercase();
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PackageUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageUrl {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PackageUrl> for String {
    fn from(url: PackageUrl) -> Self {
        url.0
    }
}

/// Where a package is in the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Reconciliation,
    Ingestion,
    Analysis,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Reconciliation => "reconciliation",
            ProcessingStage::Ingestion => "ingestion",
            ProcessingStage::Analysis => "analysis",
        }
    }
}

impl std::str::FromStr for ProcessingStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reconciliation" => Ok(ProcessingStage::Reconciliation),
            "ingestion" => Ok(ProcessingStage::Ingestion),
            "analysis" => Ok(ProcessingStage::Analysis),
            other => Err(Error::Internal(format!("unknown processing stage: {}", other))),
        }
    }
}

/// A package whose build matrix is maintained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPackage {
    pub id: PackageId,
    pub url: PackageUrl,
    pub processing_stage: ProcessingStage,
    pub created_at: DateTime<Utc>,
}

impl TrackedPackage {
    /// A freshly listed package, waiting for the first reconciliation pass.
    pub fn new(url: PackageUrl) -> Self {
        Self {
            id: PackageId::new(),
            url,
            processing_stage: ProcessingStage::Reconciliation,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_url_ignores_case_and_trailing_slash() {
        let a = PackageUrl::parse("https://GitHub.com/Foo/Bar.git/").unwrap();
        let b = PackageUrl::parse("https://github.com/foo/bar.git").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://github.com/foo/bar.git");
    }

    #[test]
    fn test_rejects_malformed_urls() {
        assert!(PackageUrl::parse("not a url").is_err());
        assert!(PackageUrl::parse("ftp://example.com/foo").is_err());
        assert!(PackageUrl::parse("").is_err());
    }

    #[test]
    fn test_new_package_awaits_reconciliation() {
        let pkg = TrackedPackage::new(PackageUrl::parse("https://example.com/a").unwrap());
        assert_eq!(pkg.processing_stage, ProcessingStage::Reconciliation);
    }

    #[test]
    fn test_processing_stage_parsing() {
        for stage in [
            ProcessingStage::Reconciliation,
            ProcessingStage::Ingestion,
            ProcessingStage::Analysis,
        ] {
            assert_eq!(stage.as_str().parse::<ProcessingStage>().unwrap(), stage);
        }
        assert!("archived".parse::<ProcessingStage>().is_err());
    }
}
