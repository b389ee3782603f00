//! Control law
//!
//! Given the identified response R and the current state s, the corrective
//! step is the minimum-norm solution of
//!
//! R · p = −s
//!
//! computed with the SVD pseudoinverse, then projected into the feasible
//! power box [0, gain]. Pistons can only lower their corner, so negative
//! entries are dropped rather than reversed.

use crate::estimation::State;
use crate::math::solve_min_norm;
use crate::plant::Corner;
use crate::{Powers, ResponseMatrix};

use super::{LevelerConfig, StepScaling, TiltBias};

/// Pseudoinverse control law with power projection
#[derive(Debug, Clone)]
pub struct ControlLaw {
    gain: f64,
    scaling: StepScaling,
    tilt_bias: Option<TiltBias>,
}

impl ControlLaw {
    pub fn new(gain: f64, scaling: StepScaling, tilt_bias: Option<TiltBias>) -> Self {
        Self {
            gain,
            scaling,
            tilt_bias,
        }
    }

    pub fn from_config(config: &LevelerConfig) -> Self {
        Self::new(config.gain, config.step_scaling, config.tilt_bias)
    }

    /// Feasible corrective powers for `state`
    pub fn solve(&self, response: &ResponseMatrix, state: &State) -> Powers {
        let target = -state.to_vector();
        let raw = solve_min_norm(response, &target);
        let biased = match &self.tilt_bias {
            Some(bias) => apply_tilt_bias(&raw, state, bias),
            None => raw,
        };
        project_powers(&biased, self.gain, self.scaling)
    }
}

/// Scale the corner pair on the high side of each tilted axis
///
/// tilt_x > 0 means the A–B side is high; tilt_y > 0 means the B–C side is
/// high. Axes within the threshold are left alone.
pub fn apply_tilt_bias(powers: &Powers, state: &State, bias: &TiltBias) -> Powers {
    let up = 1.0 + bias.factor;
    let down = 1.0 - bias.factor;
    let mut scale = [1.0; 4];

    let mut boost = |high: [Corner; 2], low: [Corner; 2]| {
        for c in high {
            scale[c.index()] *= up;
        }
        for c in low {
            scale[c.index()] *= down;
        }
    };

    if state.tilt_x > bias.threshold {
        boost([Corner::A, Corner::B], [Corner::C, Corner::D]);
    } else if state.tilt_x < -bias.threshold {
        boost([Corner::C, Corner::D], [Corner::A, Corner::B]);
    }

    if state.tilt_y > bias.threshold {
        boost([Corner::B, Corner::C], [Corner::A, Corner::D]);
    } else if state.tilt_y < -bias.threshold {
        boost([Corner::A, Corner::D], [Corner::B, Corner::C]);
    }

    powers.component_mul(&Powers::from(scale))
}

/// Project raw powers into [0, gain]
///
/// Non-finite entries become 0 and negative entries are clipped to 0. The
/// remaining vector is rescaled per `scaling`. An all-zero vector stays zero.
pub fn project_powers(raw: &Powers, gain: f64, scaling: StepScaling) -> Powers {
    let clipped = raw.map(|p| if p.is_finite() { p.max(0.0) } else { 0.0 });
    let max = clipped.max();
    if max <= 0.0 {
        return Powers::zeros();
    }

    let scaled = match scaling {
        StepScaling::Normalize => clipped * (gain / max),
        StepScaling::Clamp if max > gain => clipped * (gain / max),
        StepScaling::Clamp => clipped,
    };
    scaled.map(|p| p.clamp(0.0, gain))
}
