//! Simulated block
//!
//! Holds the true corner heights, applies noisy piston pulses and produces
//! noisy tilt and height readings. All randomness comes from one injected
//! RNG, so a seeded simulator replays exactly.

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::plant::{BlockDynamics, Corner, CornerSet, CornerStatus};
use crate::rig::LevelingRig;
use crate::{LevelError, LevelResult};

use super::{HeightModel, NoiseSource, PlantConfig};

/// One applied piston pulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Actuation {
    pub corner: Corner,
    /// Power after clamping to [0, 1]
    pub power: f64,
    /// Resulting corner height change [mm]
    pub delta: f64,
}

/// Plant history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantHistory {
    /// Applied actuations, in order
    pub actuations: Vec<Actuation>,
    /// Corner heights, starting with the initial set and one entry per actuation
    pub trajectory: Vec<CornerSet>,
}

impl PlantHistory {
    pub fn new(initial: CornerSet) -> Self {
        Self {
            actuations: Vec::new(),
            trajectory: vec![initial],
        }
    }

    /// Record an actuation and the corner heights it produced
    pub fn record(&mut self, actuation: Actuation, corners: CornerSet) {
        self.actuations.push(actuation);
        self.trajectory.push(corners);
    }

    /// Number of recorded actuations
    pub fn len(&self) -> usize {
        self.actuations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actuations.is_empty()
    }

    /// Lowest corner height ever reached [mm]
    pub fn lowest_corner(&self) -> f64 {
        self.trajectory
            .iter()
            .map(CornerSet::min)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Simulated leveling rig
#[derive(Debug, Clone)]
pub struct SimulatedBlock<R: Rng = StdRng> {
    config: PlantConfig,
    dynamics: BlockDynamics,
    corners: CornerSet,
    noise: NoiseSource<R>,
    pending_faults: usize,
    history: PlantHistory,
}

impl SimulatedBlock<StdRng> {
    /// Create a simulator seeded from `config.seed`
    pub fn new(config: PlantConfig) -> LevelResult<Self> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> SimulatedBlock<R> {
    /// Create a simulator drawing noise from `rng`
    pub fn with_rng(config: PlantConfig, rng: R) -> LevelResult<Self> {
        config.validate()?;
        let corners = config.initial_heights;
        Ok(Self {
            dynamics: BlockDynamics::new(config.block.clone()),
            corners,
            noise: NoiseSource::new(rng),
            pending_faults: 0,
            history: PlantHistory::new(corners),
            config,
        })
    }

    pub fn config(&self) -> &PlantConfig {
        &self.config
    }

    pub fn dynamics(&self) -> &BlockDynamics {
        &self.dynamics
    }

    /// True corner heights [mm]
    pub fn corners(&self) -> CornerSet {
        self.corners
    }

    /// Overwrite the true corner heights, e.g. to stage a fault
    pub fn set_corner_heights(&mut self, corners: CornerSet) {
        self.corners = corners;
    }

    pub fn history(&self) -> &PlantHistory {
        &self.history
    }

    /// Restore the initial corner heights and clear history and faults
    ///
    /// The RNG keeps its position; build a new simulator to replay a seed.
    pub fn reset(&mut self) {
        self.corners = self.config.initial_heights;
        self.pending_faults = 0;
        self.history = PlantHistory::new(self.corners);
    }

    /// Fail the next `count` raw height reads with a sensor fault
    pub fn inject_sensor_faults(&mut self, count: usize) {
        self.pending_faults += count;
    }

    /// Pulse the piston under `corner_id` (0..4) with `power`
    ///
    /// Power is clamped to [0, 1]; non-positive power is a no-op.
    pub fn apply_power(&mut self, corner_id: usize, power: f64) -> LevelResult<()> {
        let corner = Corner::try_from(corner_id)?;
        if !power.is_finite() {
            return Err(LevelError::InvalidArgument(format!(
                "power for corner {corner} must be finite, got {power}"
            )));
        }

        let power = power.clamp(0.0, 1.0);
        if power <= 0.0 {
            return Ok(());
        }

        let nu = self.noise.uniform(self.config.actuation_noise);
        let delta = self.dynamics.displacement(power, nu);
        self.corners[corner] += delta;
        trace!("corner {corner}: power {power:.4} -> Δz {delta:.4} mm");

        self.history.record(
            Actuation {
                corner,
                power,
                delta,
            },
            self.corners,
        );
        Ok(())
    }

    /// Noisy tilt `(tilt_x, tilt_y)` [rad]
    pub fn sense_tilt(&mut self) -> (f64, f64) {
        let (tilt_x, tilt_y) = self.dynamics.tilt(&self.corners);
        let std = self.config.sensors.tilt_noise_std;
        (
            tilt_x + self.noise.gaussian(std),
            tilt_y + self.noise.gaussian(std),
        )
    }

    /// Noisy fused height [mm]
    pub fn sense_height(&mut self) -> f64 {
        let model = self.config.sensors.height_model;
        match model {
            HeightModel::EdgeLasers => {
                let count = self.config.sensors.lasers.len();
                let sum: f64 = (0..count).map(|i| self.laser_reading(i)).sum();
                sum / count as f64 + self.noise.gaussian(self.config.sensors.fusion_noise_std)
            }
            HeightModel::InverseDistance => self.inverse_distance_reading(),
        }
    }

    /// `count` raw height readings [mm]
    ///
    /// Edge lasers give one reading per mount, in mount order. The
    /// inverse-distance model gives `count` independent readings.
    pub fn raw_height_samples(&mut self, count: usize) -> LevelResult<Vec<f64>> {
        let available = self.config.sensors.sensor_count();
        if count == 0 || count > available {
            return Err(LevelError::InvalidArgument(format!(
                "requested {count} height samples, {available} sensors mounted"
            )));
        }

        if self.pending_faults > 0 {
            self.pending_faults -= 1;
            return Err(LevelError::sensor_fault("height", "injected fault"));
        }

        let model = self.config.sensors.height_model;
        let samples: Vec<f64> = match model {
            HeightModel::EdgeLasers => (0..count).map(|i| self.laser_reading(i)).collect(),
            HeightModel::InverseDistance => {
                (0..count).map(|_| self.inverse_distance_reading()).collect()
            }
        };
        Ok(samples)
    }

    /// Per-corner diagnostic classification
    pub fn corner_status(&self) -> [CornerStatus; 4] {
        self.dynamics
            .corner_status(&self.corners, self.config.sensors.status_threshold)
    }

    fn laser_reading(&mut self, index: usize) -> f64 {
        let mount = self.config.sensors.lasers[index];
        mount.height(&self.corners) + self.noise.gaussian(self.config.sensors.laser_noise_std)
    }

    fn inverse_distance_reading(&mut self) -> f64 {
        self.dynamics.inverse_distance_height(&self.corners)
            + self
                .noise
                .gaussian(self.config.sensors.inverse_distance_noise_std)
    }
}

impl<R: Rng> LevelingRig for SimulatedBlock<R> {
    fn read_tilt(&mut self) -> LevelResult<(f64, f64)> {
        Ok(self.sense_tilt())
    }

    fn read_raw_height_samples(&mut self, sensor_count: usize) -> LevelResult<Vec<f64>> {
        self.raw_height_samples(sensor_count)
    }

    fn actuate(&mut self, corner: Corner, power: f64) -> LevelResult<()> {
        self.apply_power(corner.index(), power)
    }

    fn sensor_count(&self) -> usize {
        self.config.sensors.sensor_count()
    }

    fn corner_heights(&self) -> Option<CornerSet> {
        Some(self.corners)
    }
}
