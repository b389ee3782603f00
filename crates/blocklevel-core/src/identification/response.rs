//! Perturb-and-measure response matrix
//!
//! For each corner j in order A, B, C, D:
//!
//! R[:, j] = (s_after − s_before) / p_test
//!
//! where s is the estimated state and p_test the calibration pulse. The
//! matrix is rebuilt on every outer iteration; the block response changes
//! as pistons extend.

use std::time::Duration;

use log::debug;

use crate::estimation::{State, StateEstimator};
use crate::plant::Corner;
use crate::rig::{pause, LevelingRig};
use crate::{LevelError, LevelResult, ResponseMatrix};

/// Result of one identification pass
#[derive(Debug, Clone)]
pub struct Identification {
    /// Identified 3×4 response
    pub response: ResponseMatrix,
    /// State measured after the last calibration pulse
    pub state: State,
}

/// Perturb-and-measure identifier
#[derive(Debug, Clone)]
pub struct ResponseIdentifier {
    test_power: f64,
    settle: Duration,
}

impl ResponseIdentifier {
    /// `test_power` must lie in (0, 1]
    pub fn new(test_power: f64, settle: Duration) -> LevelResult<Self> {
        if !(test_power > 0.0 && test_power <= 1.0) {
            return Err(LevelError::InvalidArgument(format!(
                "test power must lie in (0, 1], got {test_power}"
            )));
        }
        Ok(Self { test_power, settle })
    }

    pub fn test_power(&self) -> f64 {
        self.test_power
    }

    /// Pulse each corner once and build the response matrix
    pub fn identify<R: LevelingRig + ?Sized>(
        &self,
        rig: &mut R,
        estimator: &mut StateEstimator,
    ) -> LevelResult<Identification> {
        let mut response = ResponseMatrix::zeros();
        let mut state = estimator.read(rig)?;

        for corner in Corner::ALL {
            let before = state;
            rig.actuate(corner, self.test_power)?;
            pause(self.settle);
            let after = estimator.read(rig)?;

            let column = (after - before).to_vector() / self.test_power;
            response.set_column(corner.index(), &column);
            debug!(
                "corner {corner} response: [{:.3e}, {:.3e}, {:.4}]",
                column[0], column[1], column[2]
            );
            state = after;
        }

        Ok(Identification { response, state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::{EstimatorConfig, HeightFilterParams};
    use crate::math::median;
    use crate::simulation::{PlantConfig, SimulatedBlock};
    use approx::assert_relative_eq;

    fn exact_estimator() -> StateEstimator {
        StateEstimator::new(EstimatorConfig {
            samples: 1,
            sample_interval_ms: 0,
            filter: HeightFilterParams::pass_through(),
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_test_power() {
        assert!(ResponseIdentifier::new(0.0, Duration::ZERO).is_err());
        assert!(ResponseIdentifier::new(1.5, Duration::ZERO).is_err());
        assert!(ResponseIdentifier::new(f64::NAN, Duration::ZERO).is_err());
    }

    #[test]
    fn test_identifies_noiseless_block() {
        let config = PlantConfig::default().noiseless();
        let mut block = SimulatedBlock::new(config).unwrap();
        let mut estimator = exact_estimator();
        let identifier = ResponseIdentifier::new(0.1, Duration::ZERO).unwrap();

        let id = identifier.identify(&mut block, &mut estimator).unwrap();

        // Four pulses, one per corner, in order
        let corners: Vec<Corner> = block.history().actuations.iter().map(|a| a.corner).collect();
        assert_eq!(corners, Corner::ALL.to_vec());

        // Lasers start at near@0.5 = 2.5, far@0.25 = -0.25, far@0.75 = 5.25 and
        // the near laser stays the batch median throughout. A 0.5 mm drop of A
        // or B moves it by 0.25 mm; C and D never reach the median.
        let k = 5.0;
        assert_relative_eq!(id.response[(2, 0)], -k * 0.5, epsilon = 1e-6);
        assert_relative_eq!(id.response[(2, 1)], -k * 0.5, epsilon = 1e-6);
        assert_relative_eq!(id.response[(2, 2)], 0.0, epsilon = 1e-6);
        assert_relative_eq!(id.response[(2, 3)], 0.0, epsilon = 1e-6);

        // Dropping a corner at y < 0 gives negative tilt_x
        assert!(id.response[(0, 0)] < 0.0);
        assert!(id.response[(0, 3)] > 0.0);
        // Dropping a left corner (x < 0) gives positive tilt_y
        assert!(id.response[(1, 0)] > 0.0);
        assert!(id.response[(1, 1)] < 0.0);

        let raw = block.raw_height_samples(3).unwrap();
        assert_relative_eq!(id.state.height, median(&raw).unwrap(), epsilon = 1e-6);
        let z = block.corners();
        assert_relative_eq!(id.state.height, (z[Corner::A] + z[Corner::B]) / 2.0, epsilon = 1e-6);
        assert_relative_eq!(id.state.height, 2.0, epsilon = 1e-6);
    }
}
