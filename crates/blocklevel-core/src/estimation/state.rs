//! Leveling state
//!
//! The state is the deviation of the block from the leveled, flush target:
//!
//! s = [tilt_x, tilt_y, height]ᵀ
//!
//! Tilts are in radians, height in millimetres.

use std::fmt;
use std::ops::Sub;

use serde::{Deserialize, Serialize};

use crate::{LevelError, LevelResult, StateVec};

/// Block state relative to the target plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    /// Rotation about the x axis [rad]
    pub tilt_x: f64,
    /// Rotation about the y axis [rad]
    pub tilt_y: f64,
    /// Height offset against the reference surface [mm]
    pub height: f64,
}

impl State {
    pub fn new(tilt_x: f64, tilt_y: f64, height: f64) -> Self {
        Self {
            tilt_x,
            tilt_y,
            height,
        }
    }

    pub fn to_vector(&self) -> StateVec {
        StateVec::new(self.tilt_x, self.tilt_y, self.height)
    }

    pub fn from_vector(v: &StateVec) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    /// ‖s ./ tol‖₂ over the three state components
    ///
    /// Values below 1 are inside the tolerance ellipsoid.
    pub fn normalized_error(&self, tol: &Tolerance) -> f64 {
        self.to_vector().component_div(&tol.as_vector()).norm()
    }

    /// Tilts in degrees `(tilt_x, tilt_y)`
    pub fn tilt_degrees(&self) -> (f64, f64) {
        (self.tilt_x.to_degrees(), self.tilt_y.to_degrees())
    }
}

impl Sub for State {
    type Output = State;

    fn sub(self, rhs: State) -> State {
        State::new(
            self.tilt_x - rhs.tilt_x,
            self.tilt_y - rhs.tilt_y,
            self.height - rhs.height,
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (tx, ty) = self.tilt_degrees();
        write!(
            f,
            "tilt_x {tx:+.4}°, tilt_y {ty:+.4}°, height {:+.3} mm",
            self.height
        )
    }
}

/// Convergence tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// [rad]
    pub tilt_x: f64,
    /// [rad]
    pub tilt_y: f64,
    /// [mm]
    pub height: f64,
    /// Maximum |corner height| [mm], checked only when ground truth exists
    pub corner: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            tilt_x: 0.001,
            tilt_y: 0.001,
            height: 0.1,
            corner: 1.0,
        }
    }
}

impl Tolerance {
    pub fn as_vector(&self) -> StateVec {
        StateVec::new(self.tilt_x, self.tilt_y, self.height)
    }

    pub fn validate(&self) -> LevelResult<()> {
        for (name, value) in [
            ("tilt_x", self.tilt_x),
            ("tilt_y", self.tilt_y),
            ("height", self.height),
            ("corner", self.corner),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(LevelError::InvalidArgument(format!(
                    "tolerance {name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_round_trip() {
        let state = State::new(0.01, -0.02, 3.5);
        assert_eq!(State::from_vector(&state.to_vector()), state);
    }

    #[test]
    fn test_normalized_error() {
        let tol = Tolerance::default();
        let state = State::new(0.0006, 0.0, 0.08);
        // sqrt(0.6² + 0.8²) = 1
        assert_relative_eq!(state.normalized_error(&tol), 1.0, epsilon = 1e-12);
        assert_eq!(State::default().normalized_error(&tol), 0.0);
    }

    #[test]
    fn test_state_difference() {
        let delta = State::new(0.1, 0.2, 3.0) - State::new(0.05, 0.25, 1.0);
        assert_relative_eq!(delta.tilt_x, 0.05, epsilon = 1e-12);
        assert_relative_eq!(delta.tilt_y, -0.05, epsilon = 1e-12);
        assert_relative_eq!(delta.height, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_display_in_degrees() {
        let state = State::new(std::f64::consts::PI / 180.0, 0.0, -1.0);
        assert_eq!(
            state.to_string(),
            "tilt_x +1.0000°, tilt_y +0.0000°, height -1.000 mm"
        );
    }

    #[test]
    fn test_tolerance_must_be_positive() {
        assert!(Tolerance::default().validate().is_ok());
        let tol = Tolerance {
            height: 0.0,
            ..Tolerance::default()
        };
        assert!(tol.validate().is_err());
    }
}
