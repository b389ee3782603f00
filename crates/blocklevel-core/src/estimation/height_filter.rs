//! Scalar recursive height filter
//!
//! The block height is modelled as a random walk observed directly:
//!
//! Predict: x⁻ = x,  P⁻ = P
//! Update:  g = P / (P + R)
//!          x = x + g · (z − x)
//!          P = (1 − g) · P + Q
//!
//! Process noise is added after the update. From any prior the variance converges to the fixed point
//! P* = (Q + √(Q² + 4QR)) / 2.

use serde::{Deserialize, Serialize};

use crate::{LevelError, LevelResult};

/// Height filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightFilterParams {
    /// Process noise variance Q [mm²]
    pub process_noise: f64,
    /// Measurement noise variance R [mm²]
    pub measurement_noise: f64,
    /// Initial estimate [mm]
    pub initial_estimate: f64,
    /// Initial variance [mm²]
    pub initial_variance: f64,
}

impl Default for HeightFilterParams {
    fn default() -> Self {
        Self {
            process_noise: 0.5,
            measurement_noise: 0.02,
            initial_estimate: 0.0,
            initial_variance: 100.0,
        }
    }
}

impl HeightFilterParams {
    /// Parameters under which the filter follows each measurement
    pub fn pass_through() -> Self {
        Self {
            process_noise: 1e6,
            measurement_noise: 1e-12,
            initial_estimate: 0.0,
            initial_variance: 1e6,
        }
    }

    pub fn validate(&self) -> LevelResult<()> {
        if !(self.measurement_noise > 0.0) || !self.measurement_noise.is_finite() {
            return Err(LevelError::InvalidArgument(format!(
                "measurement noise must be positive, got {}",
                self.measurement_noise
            )));
        }
        if !(self.process_noise >= 0.0) || !self.process_noise.is_finite() {
            return Err(LevelError::InvalidArgument(format!(
                "process noise must be non-negative, got {}",
                self.process_noise
            )));
        }
        if !(self.initial_variance >= 0.0)
            || !self.initial_variance.is_finite()
            || !self.initial_estimate.is_finite()
        {
            return Err(LevelError::InvalidArgument(
                "initial estimate must be finite with non-negative variance".into(),
            ));
        }
        Ok(())
    }
}

/// Scalar Kalman filter on the block height
#[derive(Debug, Clone)]
pub struct HeightFilter {
    params: HeightFilterParams,
    estimate: f64,
    variance: f64,
    gain: f64,
}

impl HeightFilter {
    pub fn new(params: HeightFilterParams) -> LevelResult<Self> {
        params.validate()?;
        Ok(Self {
            estimate: params.initial_estimate,
            variance: params.initial_variance,
            gain: 0.0,
            params,
        })
    }

    pub fn params(&self) -> &HeightFilterParams {
        &self.params
    }

    /// Restore the configured initial estimate and variance
    pub fn reset(&mut self) {
        self.estimate = self.params.initial_estimate;
        self.variance = self.params.initial_variance;
        self.gain = 0.0;
    }

    /// Fuse a measurement and return the new estimate
    pub fn update(&mut self, measurement: f64) -> f64 {
        let gain = self.variance / (self.variance + self.params.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.variance = (1.0 - gain) * self.variance + self.params.process_noise;
        self.gain = gain;

        self.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Gain used by the latest update
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Fixed point of the variance recursion
    pub fn steady_state_variance(&self) -> f64 {
        let q = self.params.process_noise;
        let r = self.params.measurement_noise;
        (q + (q * q + 4.0 * q * r).sqrt()) / 2.0
    }
}
