//! Simulation configuration
//!
//! Defines configuration structures for setting up a simulated block.

use serde::{Deserialize, Serialize};

use crate::plant::{BlockParams, CornerSet, LaserMount, LongEdge};
use crate::{LevelError, LevelResult};

/// Maximum number of laser mounts on the block
pub const MAX_LASERS: usize = 3;

/// Simulated plant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// Block geometry and stiffness
    pub block: BlockParams,
    /// Relative actuation noise half-width (ν ~ U(-s, s))
    pub actuation_noise: f64,
    /// Initial corner heights [mm]
    pub initial_heights: CornerSet,
    /// Sensor models
    pub sensors: SensorConfig,
    /// RNG seed
    pub seed: u64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            block: BlockParams::default(),
            actuation_noise: 0.2,
            initial_heights: CornerSet::new([10.0, -5.0, 8.0, -3.0]),
            sensors: SensorConfig::default(),
            seed: 42,
        }
    }
}

impl PlantConfig {
    /// Same plant with every noise source switched off
    pub fn noiseless(mut self) -> Self {
        self.actuation_noise = 0.0;
        self.sensors.laser_noise_std = 0.0;
        self.sensors.fusion_noise_std = 0.0;
        self.sensors.inverse_distance_noise_std = 0.0;
        self.sensors.tilt_noise_std = 0.0;
        self
    }

    pub fn with_initial_heights(mut self, heights: CornerSet) -> Self {
        self.initial_heights = heights;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> LevelResult<()> {
        self.block.geometry.validate()?;
        if !self.block.stiffness.is_finite() || self.block.stiffness <= 0.0 {
            return Err(LevelError::InvalidArgument(format!(
                "stiffness must be positive, got {}",
                self.block.stiffness
            )));
        }
        if !(0.0..1.0).contains(&self.actuation_noise) {
            return Err(LevelError::InvalidArgument(format!(
                "actuation noise must lie in [0, 1), got {}",
                self.actuation_noise
            )));
        }
        if self.initial_heights.iter().any(|(_, z)| !z.is_finite()) {
            return Err(LevelError::InvalidArgument(
                "initial corner heights must be finite".into(),
            ));
        }
        self.sensors.validate()
    }
}

/// How the simulated height sensor combines the corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightModel {
    /// Laser rangefinders on the long edges
    EdgeLasers,
    /// Inverse-distance weighted average of the corners
    InverseDistance,
}

/// Sensor noise configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub height_model: HeightModel,
    /// Laser mounts (1 to 3)
    pub lasers: Vec<LaserMount>,
    /// Per-laser noise std dev [mm]
    pub laser_noise_std: f64,
    /// Noise on the fused laser height [mm]
    pub fusion_noise_std: f64,
    /// Noise on the inverse-distance height [mm]
    pub inverse_distance_noise_std: f64,
    /// Tilt sensor noise std dev [rad]
    pub tilt_noise_std: f64,
    /// Corner status threshold [mm]
    pub status_threshold: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            height_model: HeightModel::EdgeLasers,
            lasers: vec![
                LaserMount::new(LongEdge::Near, 0.5),
                LaserMount::new(LongEdge::Far, 0.25),
                LaserMount::new(LongEdge::Far, 0.75),
            ],
            laser_noise_std: 0.2,
            fusion_noise_std: 0.05,
            inverse_distance_noise_std: 0.5,
            tilt_noise_std: 0.0,
            status_threshold: 2.0,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> LevelResult<()> {
        if self.lasers.is_empty() || self.lasers.len() > MAX_LASERS {
            return Err(LevelError::InvalidArgument(format!(
                "between 1 and {MAX_LASERS} lasers required, got {}",
                self.lasers.len()
            )));
        }
        if let Some(mount) = self
            .lasers
            .iter()
            .find(|m| !(0.0..=1.0).contains(&m.fraction))
        {
            return Err(LevelError::InvalidArgument(format!(
                "laser fraction must lie in [0, 1], got {}",
                mount.fraction
            )));
        }
        for (name, value) in [
            ("laser_noise_std", self.laser_noise_std),
            ("fusion_noise_std", self.fusion_noise_std),
            ("inverse_distance_noise_std", self.inverse_distance_noise_std),
            ("tilt_noise_std", self.tilt_noise_std),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LevelError::InvalidArgument(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !(self.status_threshold > 0.0) {
            return Err(LevelError::InvalidArgument(format!(
                "status threshold must be positive, got {}",
                self.status_threshold
            )));
        }
        Ok(())
    }

    /// Number of raw height readings per sample
    pub fn sensor_count(&self) -> usize {
        self.lasers.len()
    }
}
