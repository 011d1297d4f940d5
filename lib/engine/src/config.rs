//! Engine configuration.

use profilex_core::{Error, Result, DEFAULT_CALIBRATION_K, DEFAULT_CALIBRATION_THRESHOLD};
use profilex_geometry::FEATURE_DIM;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Tunable parameters of the similarity engine.
///
/// Every field has a default, so a config file only needs to name the values
/// it overrides. `validate` enforces the cross-field constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory scanned for profile images during a build
    pub image_directory: String,
    /// Path of the binary index snapshot
    pub index_path: String,
    /// Path of the JSON profile catalog
    pub metadata_path: String,
    /// Width of the appearance embedding
    pub embedding_dim: usize,
    /// Weight of the appearance embedding in the hybrid vector
    pub ai_weight: f32,
    /// Weight of the geometric descriptor in the hybrid vector
    pub geo_weight: f32,
    /// Multiplier applied to the cavity block of the geometric descriptor
    pub cavity_amplification: f32,
    /// Multiplier applied to the roughness block of the geometric descriptor
    pub roughness_amplification: f32,
    /// Sigmoid steepness of the score calibrator
    pub calibration_k: f32,
    /// Raw-similarity midpoint mapping to a 50% calibrated score
    pub calibration_threshold: f32,
    /// Default number of matches returned by a search
    pub top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            image_directory: "./profiles".to_string(),
            index_path: "./data/index.bin".to_string(),
            metadata_path: "./data/catalog.json".to_string(),
            embedding_dim: 256,
            ai_weight: 0.3,
            geo_weight: 0.7,
            cavity_amplification: 3.0,
            roughness_amplification: 2.0,
            calibration_k: DEFAULT_CALIBRATION_K,
            calibration_threshold: DEFAULT_CALIBRATION_THRESHOLD,
            top_k: 30,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file, filling unnamed fields with defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let config: Self = serde_json::from_slice(&data)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let weight_sum = self.ai_weight + self.geo_weight;
        if (weight_sum - 1.0).abs() > 0.01 {
            return Err(Error::InvalidConfig(format!(
                "ai_weight + geo_weight must sum to 1.0, got {weight_sum}"
            )));
        }
        if self.embedding_dim == 0 {
            return Err(Error::InvalidConfig(
                "embedding_dim must be positive".to_string(),
            ));
        }
        if self.calibration_k <= 0.0 {
            return Err(Error::InvalidConfig(
                "calibration_k must be positive".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be positive".to_string()));
        }
        Ok(())
    }

    /// Width of the assembled hybrid vector
    pub fn hybrid_dim(&self) -> usize {
        self.embedding_dim + FEATURE_DIM
    }
}
