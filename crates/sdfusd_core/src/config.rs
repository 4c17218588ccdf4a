//! Conversion options.

use std::path::{Path, PathBuf};

use sdfusd_usd::UpAxis;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("metersPerUnit must be positive, got {0}")]
    MetersPerUnit(f64),
}

/// Options shared by the forward and reverse builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Add the standard gz-sim system plugins to reconstructed worlds.
    pub use_gazebo_plugins: bool,
    /// Up axis written to generated stages.
    pub up_axis: UpAxis,
    /// Stage units; SDF lengths are divided by this on the way out.
    pub meters_per_unit: f64,
    /// Scope under which generated materials are written.
    pub material_scope: String,
    /// Directory relative mesh URIs are resolved against.
    pub source_dir: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            use_gazebo_plugins: true,
            up_axis: UpAxis::Z,
            meters_per_unit: 1.0,
            material_scope: "/Looks".to_string(),
            source_dir: None,
        }
    }
}

impl ConversionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.meters_per_unit.is_finite() && self.meters_per_unit > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::MetersPerUnit(self.meters_per_unit))
        }
    }

    /// Builder-style setter for the source directory.
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }
}
