//! Package versions and release channels.

use crate::ids::{PackageId, VersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Git reference a version was ingested from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Reference {
    Branch(String),
    Tag(String),
}

impl Reference {
    pub fn name(&self) -> &str {
        match self {
            Reference::Branch(name) | Reference::Tag(name) => name,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maintained release channel. A version tagged with a channel is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    DefaultBranch,
    Release,
    PreRelease,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::DefaultBranch => "default_branch",
            Channel::Release => "release",
            Channel::PreRelease => "pre_release",
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "default_branch" => Ok(Channel::DefaultBranch),
            "release" => Ok(Channel::Release),
            "pre_release" => Ok(Channel::PreRelease),
            other => Err(crate::Error::Internal(format!("unknown channel: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub package_id: PackageId,
    pub reference: Option<Reference>,
    pub latest: Option<Channel>,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn new(package_id: PackageId, reference: Option<Reference>, latest: Option<Channel>) -> Self {
        Self {
            id: VersionId::new(),
            package_id,
            reference,
            latest,
            created_at: Utc::now(),
        }
    }

    /// Significant versions keep a maintained build matrix.
    pub fn is_significant(&self) -> bool {
        self.latest.is_some()
    }

    /// Significant and checkout-able. Only these versions get build cells.
    pub fn is_buildable(&self) -> bool {
        self.is_significant() && self.reference.is_some()
    }
}
