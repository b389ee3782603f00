//! Hardware rig adapter
//!
//! Wraps three byte-level transports (tilt sensor, ranging sensors, piston
//! driver) into a [`LevelingRig`]. The transports are traits so the real
//! bus drivers stay outside this crate.
//!
//! Each ranging sensor looks down from a fixed mount, so a distance `d`
//! becomes the height `reference_distance_mm − d`.

use std::io;

use log::trace;
use serde::{Deserialize, Serialize};

use blocklevel_core::plant::Corner;
use blocklevel_core::{LevelError, LevelResult, LevelingRig};

use crate::codec::{decode_tilt_packet, parse_ranging_block};

/// Source of raw tilt packets
pub trait TiltPort {
    fn read_packet(&mut self) -> io::Result<Vec<u8>>;
}

/// Source of raw ranging blocks, one per sensor
pub trait RangingPort {
    fn read_block(&mut self, sensor: usize) -> io::Result<Vec<u8>>;
}

/// Piston power output
pub trait PistonDriver {
    fn drive(&mut self, corner: Corner, power: f64) -> io::Result<()>;
}

/// Hardware layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Number of ranging sensors
    pub ranging_sensors: usize,
    /// Mount-to-reference-surface distance [mm]
    pub reference_distance_mm: f64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            ranging_sensors: 3,
            reference_distance_mm: 200.0,
        }
    }
}

impl HardwareConfig {
    pub fn validate(&self) -> LevelResult<()> {
        if self.ranging_sensors == 0 {
            return Err(LevelError::InvalidArgument(
                "at least one ranging sensor required".into(),
            ));
        }
        if !self.reference_distance_mm.is_finite() || self.reference_distance_mm <= 0.0 {
            return Err(LevelError::InvalidArgument(format!(
                "reference distance must be positive, got {}",
                self.reference_distance_mm
            )));
        }
        Ok(())
    }
}

/// [`LevelingRig`] over real sensor and piston transports
///
/// Corner heights are unknown on hardware, so
/// [`LevelingRig::corner_heights`] is always `None`.
#[derive(Debug)]
pub struct HardwareRig<T, R, P> {
    tilt: T,
    ranging: R,
    driver: P,
    config: HardwareConfig,
}

impl<T: TiltPort, R: RangingPort, P: PistonDriver> HardwareRig<T, R, P> {
    pub fn new(tilt: T, ranging: R, driver: P, config: HardwareConfig) -> LevelResult<Self> {
        config.validate()?;
        Ok(Self {
            tilt,
            ranging,
            driver,
            config,
        })
    }

    pub fn config(&self) -> &HardwareConfig {
        &self.config
    }

    pub fn driver(&self) -> &P {
        &self.driver
    }

    pub fn into_parts(self) -> (T, R, P) {
        (self.tilt, self.ranging, self.driver)
    }

    fn read_height(&mut self, sensor: usize) -> LevelResult<f64> {
        let name = format!("laser {sensor}");
        let block = self
            .ranging
            .read_block(sensor)
            .map_err(|e| LevelError::sensor_fault(name.as_str(), e.to_string()))?;
        let distance = parse_ranging_block(&block)
            .map_err(|e| LevelError::sensor_fault(name.as_str(), e.to_string()))?
            .ok_or_else(|| LevelError::sensor_fault(name.as_str(), "no valid reading"))?;

        trace!("{name}: {distance} mm");
        Ok(self.config.reference_distance_mm - f64::from(distance))
    }
}

impl<T: TiltPort, R: RangingPort, P: PistonDriver> LevelingRig for HardwareRig<T, R, P> {
    fn read_tilt(&mut self) -> LevelResult<(f64, f64)> {
        let packet = self
            .tilt
            .read_packet()
            .map_err(|e| LevelError::sensor_fault("tilt", e.to_string()))?;
        let reading =
            decode_tilt_packet(&packet).map_err(|e| LevelError::sensor_fault("tilt", e.to_string()))?;
        Ok(reading.to_radians())
    }

    fn read_raw_height_samples(&mut self, sensor_count: usize) -> LevelResult<Vec<f64>> {
        if sensor_count == 0 || sensor_count > self.config.ranging_sensors {
            return Err(LevelError::InvalidArgument(format!(
                "requested {sensor_count} height samples, {} sensors mounted",
                self.config.ranging_sensors
            )));
        }
        (0..sensor_count).map(|i| self.read_height(i)).collect()
    }

    fn actuate(&mut self, corner: Corner, power: f64) -> LevelResult<()> {
        if !power.is_finite() {
            return Err(LevelError::InvalidArgument(format!(
                "power for corner {corner} must be finite, got {power}"
            )));
        }
        let power = power.clamp(0.0, 1.0);
        self.driver
            .drive(corner, power)
            .map_err(|e| LevelError::ActuatorFault {
                corner,
                reason: e.to_string(),
            })
    }

    fn sensor_count(&self) -> usize {
        self.config.ranging_sensors
    }
}
