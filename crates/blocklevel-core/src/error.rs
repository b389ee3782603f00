//! Error types for the leveling core

use thiserror::Error;

use crate::plant::Corner;

/// Leveling errors
///
/// Not converging is never an error; the control loop reports it through
/// [`crate::control::Outcome`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LevelError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Sensor fault on {sensor}: {reason}")]
    SensorFault { sensor: String, reason: String },
    #[error("Actuator fault on corner {corner}: {reason}")]
    ActuatorFault { corner: Corner, reason: String },
    #[error("Singular response: {0}")]
    SingularResponse(String),
    #[error("Block too low: {min_height_mm:.2} mm is below the {limit_mm:.2} mm limit")]
    UnsafeState { min_height_mm: f64, limit_mm: f64 },
}

impl LevelError {
    /// Shorthand for [`LevelError::SensorFault`]
    pub fn sensor_fault(sensor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SensorFault {
            sensor: sensor.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a (recoverable) sensor fault
    pub fn is_sensor_fault(&self) -> bool {
        matches!(self, Self::SensorFault { .. })
    }
}

/// Result alias used throughout the crate
pub type LevelResult<T> = Result<T, LevelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_fault_display() {
        let err = LevelError::sensor_fault("laser 2", "no reading");
        assert!(err.is_sensor_fault());
        assert_eq!(err.to_string(), "Sensor fault on laser 2: no reading");
    }

    #[test]
    fn test_unsafe_state_display() {
        let err = LevelError::UnsafeState {
            min_height_mm: -1.234,
            limit_mm: -0.7,
        };
        assert!(!err.is_sensor_fault());
        assert_eq!(
            err.to_string(),
            "Block too low: -1.23 mm is below the -0.70 mm limit"
        );
    }

    #[test]
    fn test_actuator_fault_names_corner() {
        let err = LevelError::ActuatorFault {
            corner: Corner::C,
            reason: "driver timeout".into(),
        };
        assert_eq!(err.to_string(), "Actuator fault on corner C: driver timeout");
    }
}
