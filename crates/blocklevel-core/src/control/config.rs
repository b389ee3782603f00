//! Leveling controller configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::estimation::Tolerance;
use crate::{LevelError, LevelResult};

/// How the solved power vector is scaled into [0, gain]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepScaling {
    /// Rescale so the largest power equals `gain`
    #[default]
    Normalize,
    /// Rescale only when the largest power exceeds `gain`
    Clamp,
}

/// Tilt-direction bias on the solved powers
///
/// When |tilt| on an axis exceeds `threshold`, the corner pair on the high
/// side is scaled by (1 + factor) and the opposite pair by (1 − factor).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltBias {
    /// [rad]
    pub threshold: f64,
    pub factor: f64,
}

impl Default for TiltBias {
    fn default() -> Self {
        Self {
            threshold: 0.001,
            factor: 0.05,
        }
    }
}

/// Leveling controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelerConfig {
    /// Convergence tolerances
    pub tolerance: Tolerance,
    /// Maximum corrective power per step, in (0, 1]
    pub gain: f64,
    /// Identification pulse power, in (0, 1]
    pub test_power: f64,
    /// Outer iteration budget
    pub max_iterations: usize,
    /// Lowest allowed corner (or raw laser) height [mm]
    pub low_limit: f64,
    /// Powers at or below this are not applied
    pub min_power: f64,
    /// Warm-up pulse applied to every corner before the first read
    pub warmup_power: Option<f64>,
    /// Optional tilt-direction heuristic
    pub tilt_bias: Option<TiltBias>,
    pub step_scaling: StepScaling,
    /// Settling delay after each actuation [ms]
    pub settle_ms: u64,
}

impl Default for LevelerConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            gain: 0.5,
            test_power: 0.1,
            max_iterations: 50,
            low_limit: -0.7,
            min_power: 0.01,
            warmup_power: None,
            tilt_bias: None,
            step_scaling: StepScaling::Normalize,
            settle_ms: 0,
        }
    }
}

impl LevelerConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn validate(&self) -> LevelResult<()> {
        self.tolerance.validate()?;

        let unit = |name: &str, value: f64| -> LevelResult<()> {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(LevelError::InvalidArgument(format!(
                    "{name} must lie in (0, 1], got {value}"
                )))
            }
        };
        unit("gain", self.gain)?;
        unit("test_power", self.test_power)?;
        if let Some(power) = self.warmup_power {
            unit("warmup_power", power)?;
        }

        if !self.low_limit.is_finite() {
            return Err(LevelError::InvalidArgument(format!(
                "low limit must be finite, got {}",
                self.low_limit
            )));
        }
        if !(self.min_power >= 0.0 && self.min_power < self.gain) {
            return Err(LevelError::InvalidArgument(format!(
                "min power must lie in [0, gain), got {}",
                self.min_power
            )));
        }
        if let Some(bias) = self.tilt_bias {
            if !(bias.threshold >= 0.0) || !(0.0..1.0).contains(&bias.factor) {
                return Err(LevelError::InvalidArgument(format!(
                    "tilt bias needs threshold >= 0 and factor in [0, 1), got {bias:?}"
                )));
            }
        }
        Ok(())
    }
}
