use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_MARKER_VALUE, DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR, DEFAULT_TOP_K,
    LAPLACIAN_APERTURE, LAPLACIAN_DELTA, LAPLACIAN_SCALE,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Laplacian high-pass parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighPassConfig {
    /// 1 or 3.
    pub aperture: usize,
    pub scale: f32,
    pub delta: f32,
    /// Keep the source alpha instead of filtering it like the color
    /// channels. Off by default: the whole RGBA frame goes through the
    /// operator.
    pub preserve_alpha: bool,
}

impl Default for HighPassConfig {
    fn default() -> Self {
        Self {
            aperture: LAPLACIAN_APERTURE,
            scale: LAPLACIAN_SCALE,
            delta: LAPLACIAN_DELTA,
            preserve_alpha: false,
        }
    }
}

/// Multi-scale cascade search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub scale_factor: f64,
    pub min_neighbors: usize,
    /// Smallest window side in frame pixels; 0 means the cascade's own size.
    pub min_size: u32,
    pub max_size: Option<u32>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: 0,
            max_size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub top_k: usize,
    pub marker_value: u8,
    pub highpass: HighPassConfig,
    pub detection: DetectionConfig,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            marker_value: DEFAULT_MARKER_VALUE,
            highpass: HighPassConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl AnnotatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1".into()));
        }
        if self.highpass.aperture != 1 && self.highpass.aperture != 3 {
            return Err(ConfigError::Invalid(format!(
                "highpass.aperture must be 1 or 3, got {}",
                self.highpass.aperture
            )));
        }
        if !self.highpass.scale.is_finite() || !self.highpass.delta.is_finite() {
            return Err(ConfigError::Invalid(
                "highpass.scale and highpass.delta must be finite".into(),
            ));
        }
        self.detection.validate()
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A factor of 1.0 or less never advances the scale pyramid.
        if self.scale_factor.is_nan() || self.scale_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "detection.scale_factor must be greater than 1.0, got {}",
                self.scale_factor
            )));
        }
        if let Some(max) = self.max_size {
            if max < self.min_size {
                return Err(ConfigError::Invalid(format!(
                    "detection.max_size ({max}) is below detection.min_size ({})",
                    self.min_size
                )));
            }
        }
        Ok(())
    }
}
