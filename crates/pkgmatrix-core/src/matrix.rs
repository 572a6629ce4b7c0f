//! Build matrix definition.

use crate::build::{BuildPair, Platform, ToolchainVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Platforms new builds are requested for.
pub const ACTIVE_PLATFORMS: [Platform; 5] = [
    Platform::Ios,
    Platform::MacosSpm,
    Platform::MacosXcodebuild,
    Platform::Linux,
    Platform::Watchos,
];

/// Toolchain versions new builds are requested for.
pub const ACTIVE_TOOLCHAINS: [ToolchainVersion; 5] = [
    ToolchainVersion::V5_1,
    ToolchainVersion::V5_2,
    ToolchainVersion::V5_3,
    ToolchainVersion::V5_4,
    ToolchainVersion::V5_5,
];

/// The full set of cells every significant version should eventually have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    platforms: Vec<Platform>,
    toolchains: Vec<ToolchainVersion>,
}

impl Matrix {
    pub fn new(platforms: Vec<Platform>, toolchains: Vec<ToolchainVersion>) -> Self {
        let mut platforms = platforms;
        platforms.sort();
        platforms.dedup();
        let mut toolchains = toolchains;
        toolchains.sort();
        toolchains.dedup();
        Self {
            platforms,
            toolchains,
        }
    }

    /// The matrix built for every significant version.
    pub fn active() -> Self {
        Self::new(ACTIVE_PLATFORMS.to_vec(), ACTIVE_TOOLCHAINS.to_vec())
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn toolchains(&self) -> &[ToolchainVersion] {
        &self.toolchains
    }

    /// Number of cells in the matrix.
    pub fn len(&self) -> usize {
        self.platforms.len() * self.toolchains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, pair: &BuildPair) -> bool {
        self.platforms.contains(&pair.platform) && self.toolchains.contains(&pair.toolchain)
    }

    /// All cells of the matrix.
    pub fn cells(&self) -> BTreeSet<BuildPair> {
        self.platforms
            .iter()
            .flat_map(|&platform| {
                self.toolchains
                    .iter()
                    .map(move |&toolchain| BuildPair::new(platform, toolchain))
            })
            .collect()
    }

    /// Cells not covered by `existing`. Pairs outside the matrix are ignored.
    pub fn missing<I>(&self, existing: I) -> BTreeSet<BuildPair>
    where
        I: IntoIterator<Item = BuildPair>,
    {
        let existing: BTreeSet<BuildPair> = existing.into_iter().collect();
        self.cells()
            .into_iter()
            .filter(|pair| !existing.contains(pair))
            .collect()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_matrix_has_25_cells() {
        let matrix = Matrix::active();
        assert_eq!(matrix.len(), 25);
        assert_eq!(matrix.cells().len(), 25);
        assert!(!matrix.contains(&BuildPair::new(Platform::Tvos, ToolchainVersion::V5_5)));
    }

    #[test]
    fn test_missing_ignores_pairs_outside_matrix() {
        let matrix = Matrix::active();
        let existing = vec![
            BuildPair::new(Platform::Ios, ToolchainVersion::V5_5),
            BuildPair::new(Platform::Tvos, ToolchainVersion::V5_5),
        ];
        let missing = matrix.missing(existing);
        assert_eq!(missing.len(), 24);
        assert!(!missing.contains(&BuildPair::new(Platform::Ios, ToolchainVersion::V5_5)));
    }

    #[test]
    fn test_duplicate_dimensions_collapse() {
        let matrix = Matrix::new(
            vec![Platform::Linux, Platform::Linux],
            vec![ToolchainVersion::V5_4],
        );
        assert_eq!(matrix.len(), 1);
    }
}
