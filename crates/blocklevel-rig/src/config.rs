//! Session configuration
//!
//! A [`RigConfig`] bundles every tunable of a leveling session and loads
//! from JSON. Missing sections and fields fall back to their defaults:
//!
//! ```json
//! {
//!   "plant": { "seed": 7, "initial_heights": [10.0, -5.0, 8.0, -3.0] },
//!   "leveler": { "gain": 0.5, "step_scaling": "Clamp" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use blocklevel_core::control::LevelerConfig;
use blocklevel_core::estimation::EstimatorConfig;
use blocklevel_core::simulation::PlantConfig;
use blocklevel_core::LevelError;

use crate::hardware::HardwareConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] LevelError),
}

/// Complete leveling session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Simulated plant (ignored on hardware)
    pub plant: PlantConfig,
    pub estimator: EstimatorConfig,
    pub leveler: LevelerConfig,
    /// Hardware layout (ignored in simulation)
    pub hardware: HardwareConfig,
}

impl RigConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: RigConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plant.validate()?;
        self.estimator.validate()?;
        self.leveler.validate()?;
        self.hardware.validate()?;
        Ok(())
    }
}
