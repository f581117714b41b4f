// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Evaluation configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up by [`CsgConfig::load`]
pub const CONFIG_FILE_NAME: &str = "polyframe-csg.toml";

/// Numeric tolerances used throughout the pipeline.
///
/// Each tolerance has a single use. `plane_distance` is deliberately coarser
/// than the degeneracy tolerances so model-scale rounding never produces
/// spurious spanning triangles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Signed distance below which a vertex counts as on a splitting plane
    pub plane_distance: f64,
    /// `1 - |n1 . n2|` below which two planes count as parallel
    pub parallel: f64,
    /// Minimum edge length of an emitted fragment
    pub degenerate_edge: f64,
    /// Minimum interior angle (radians) of an emitted fragment
    pub degenerate_angle: f64,
    /// Hit distance below which a fragment is reported coplanar
    pub touching: f64,
    /// Plane equality tolerance for the coplanar intersection fallback
    pub coplanar_plane: f64,
    /// Magnitude of the direction jitter in the voting classifier
    pub jitter: f64,
    /// Quantization step for half-edge vertex hashing
    pub half_edge_precision: f64,
    /// Absolute floor of the collinearity tolerance for unmatched edges
    pub disjoint_distance: f64,
    /// Collinearity tolerance for unmatched edges as a fraction of model extent
    pub disjoint_relative: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            plane_distance: 1e-8,
            parallel: 1e-10,
            degenerate_edge: 1e-10,
            degenerate_angle: 1e-9,
            touching: 1e-10,
            coplanar_plane: 1e-10,
            jitter: 1e-5,
            half_edge_precision: 1e-6,
            disjoint_distance: 1e-6,
            // a few single-precision ulps, since output buffers are f32
            disjoint_relative: 32.0 * f32::EPSILON as f64,
        }
    }
}

/// Bounding volume hierarchy build parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    /// Leaf size below which nodes stop splitting
    pub max_leaf_triangles: usize,
    /// Hard depth limit
    pub max_depth: usize,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            max_leaf_triangles: 4,
            max_depth: 32,
        }
    }
}

/// Options for a boolean evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsgConfig {
    /// Preserve multi-material groups in the output
    pub use_groups: bool,
    /// Repair connectivity between collinear but not vertex-identical edges
    pub match_disjoint_edges: bool,
    /// Rays cast by the coplanar-aware classifier
    pub vote_samples: usize,
    /// Numeric tolerances
    pub tolerances: Tolerances,
    /// Spatial index parameters
    pub bvh: BvhConfig,
}

impl Default for CsgConfig {
    fn default() -> Self {
        Self {
            use_groups: true,
            match_disjoint_edges: true,
            vote_samples: 3,
            tolerances: Tolerances::default(),
            bvh: BvhConfig::default(),
        }
    }
}

impl CsgConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: CsgConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE_NAME).exists() {
            Self::from_file(CONFIG_FILE_NAME)?
        } else {
            Self::default()
        };

        if let Ok(use_groups) = std::env::var("POLYFRAME_CSG_USE_GROUPS") {
            config.use_groups = use_groups.parse().unwrap_or(config.use_groups);
        }

        if let Ok(samples) = std::env::var("POLYFRAME_CSG_VOTE_SAMPLES") {
            config.vote_samples = samples.parse().unwrap_or(config.vote_samples);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Builder-style toggle for material groups
    pub fn with_groups(mut self, use_groups: bool) -> Self {
        self.use_groups = use_groups;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CsgConfig = toml::from_str(
            r#"
            use_groups = false

            [tolerances]
            touching = 1e-9
            "#,
        )
        .unwrap();

        assert!(!config.use_groups);
        assert_eq!(config.vote_samples, 3);
        assert_eq!(config.tolerances.touching, 1e-9);
        assert_eq!(config.tolerances.plane_distance, Tolerances::default().plane_distance);
        assert_eq!(config.bvh, BvhConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let config = CsgConfig {
            vote_samples: 5,
            ..CsgConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = CsgConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_plane_tolerance_coarser_than_degeneracy() {
        let tol = Tolerances::default();
        assert!(tol.plane_distance > tol.degenerate_edge);
    }
}
