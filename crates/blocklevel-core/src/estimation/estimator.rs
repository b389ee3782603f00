//! Block state estimator
//!
//! Tilt is passed straight through from the rig. Height is fused in two
//! stages:
//!
//! 1. `N` raw batches (one reading per sensor) are each reduced to their
//!    median, rejecting a single bad laser.
//! 2. The mean of the batch medians is fed to the [`HeightFilter`].
//!
//! A batch that fails with a sensor fault is skipped. The read fails only
//! when every batch fails.

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::math::{mean, median};
use crate::rig::{pause, LevelingRig};
use crate::{LevelError, LevelResult};

use super::{HeightFilter, HeightFilterParams, State};

/// Estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Raw batches per height estimate
    pub samples: usize,
    /// Delay between batches [ms]
    pub sample_interval_ms: u64,
    /// Height filter noise and prior
    pub filter: HeightFilterParams,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            samples: 10,
            sample_interval_ms: 0, // simulation runs at full speed
            filter: HeightFilterParams::default(),
        }
    }
}

impl EstimatorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn validate(&self) -> LevelResult<()> {
        if self.samples == 0 {
            return Err(LevelError::InvalidArgument(
                "estimator needs at least one sample batch".into(),
            ));
        }
        self.filter.validate()
    }
}

/// State estimator
#[derive(Debug, Clone)]
pub struct StateEstimator {
    config: EstimatorConfig,
    filter: HeightFilter,
    last_min_raw: Option<f64>,
}

impl StateEstimator {
    pub fn new(config: EstimatorConfig) -> LevelResult<Self> {
        config.validate()?;
        Ok(Self {
            filter: HeightFilter::new(config.filter)?,
            config,
            last_min_raw: None,
        })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn filter(&self) -> &HeightFilter {
        &self.filter
    }

    /// Reset the height filter to its prior
    pub fn reset(&mut self) {
        self.filter.reset();
        self.last_min_raw = None;
    }

    /// Lowest raw height reading seen by the latest [`Self::read`] [mm]
    pub fn last_min_raw(&self) -> Option<f64> {
        self.last_min_raw
    }

    /// Read the current block state from the rig
    pub fn read<R: LevelingRig + ?Sized>(&mut self, rig: &mut R) -> LevelResult<State> {
        let (tilt_x, tilt_y) = rig.read_tilt()?;

        let sensors = rig.sensor_count();
        let mut medians = Vec::with_capacity(self.config.samples);
        let mut min_raw = f64::INFINITY;
        let mut last_fault = None;

        for i in 0..self.config.samples {
            if i > 0 {
                pause(self.config.sample_interval());
            }

            let batch = match rig.read_raw_height_samples(sensors) {
                Ok(batch) => batch,
                Err(e) if e.is_sensor_fault() => {
                    warn!("height batch {i} skipped: {e}");
                    last_fault = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if batch.iter().any(|v| !v.is_finite()) {
                let e = LevelError::sensor_fault("height", "non-finite reading");
                warn!("height batch {i} skipped: {e}");
                last_fault = Some(e);
                continue;
            }

            if let Some(m) = median(&batch) {
                medians.push(m);
                min_raw = batch.iter().copied().fold(min_raw, f64::min);
            }
        }

        let fused = match mean(&medians) {
            Some(z) => z,
            None => {
                return Err(last_fault
                    .unwrap_or_else(|| LevelError::sensor_fault("height", "no readings")))
            }
        };

        let height = self.filter.update(fused);
        self.last_min_raw = Some(min_raw);
        debug!(
            "fused height {fused:.4} mm from {} batches -> filtered {height:.4} mm (P = {:.4})",
            medians.len(),
            self.filter.variance()
        );

        Ok(State::new(tilt_x, tilt_y, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plant::{Corner, CornerSet};
    use approx::assert_relative_eq;

    /// Rig replaying scripted height batches
    struct ScriptedRig {
        tilt: (f64, f64),
        batches: Vec<LevelResult<Vec<f64>>>,
    }

    impl LevelingRig for ScriptedRig {
        fn read_tilt(&mut self) -> LevelResult<(f64, f64)> {
            Ok(self.tilt)
        }

        fn read_raw_height_samples(&mut self, _sensor_count: usize) -> LevelResult<Vec<f64>> {
            if self.batches.is_empty() {
                return Err(LevelError::sensor_fault("height", "script exhausted"));
            }
            self.batches.remove(0)
        }

        fn actuate(&mut self, _corner: Corner, _power: f64) -> LevelResult<()> {
            Ok(())
        }

        fn sensor_count(&self) -> usize {
            3
        }

        fn corner_heights(&self) -> Option<CornerSet> {
            None
        }
    }

    fn estimator(samples: usize) -> StateEstimator {
        StateEstimator::new(EstimatorConfig {
            samples,
            sample_interval_ms: 0,
            filter: HeightFilterParams::pass_through(),
        })
        .unwrap()
    }

    #[test]
    fn test_median_rejects_outlier_laser() {
        let mut rig = ScriptedRig {
            tilt: (0.01, -0.02),
            batches: vec![Ok(vec![1.0, 50.0, 1.2]), Ok(vec![0.8, 1.0, -40.0])],
        };
        let mut est = estimator(2);
        let state = est.read(&mut rig).unwrap();

        assert_eq!(state.tilt_x, 0.01);
        assert_eq!(state.tilt_y, -0.02);
        // medians 1.2 and 0.8
        assert_relative_eq!(state.height, 1.0, epsilon = 1e-9);
        assert_eq!(est.last_min_raw(), Some(-40.0));
    }

    #[test]
    fn test_faulty_batches_are_skipped() {
        let mut rig = ScriptedRig {
            tilt: (0.0, 0.0),
            batches: vec![
                Err(LevelError::sensor_fault("laser 1", "out of range")),
                Ok(vec![2.0, 2.0, 2.0]),
                Ok(vec![f64::NAN, 2.0, 2.0]),
            ],
        };
        let state = estimator(3).read(&mut rig).unwrap();
        assert_relative_eq!(state.height, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_all_batches_failing_propagates_fault() {
        let mut rig = ScriptedRig {
            tilt: (0.0, 0.0),
            batches: vec![
                Err(LevelError::sensor_fault("laser 1", "out of range")),
                Err(LevelError::sensor_fault("laser 2", "out of range")),
            ],
        };
        let err = estimator(2).read(&mut rig).unwrap_err();
        assert_eq!(err, LevelError::sensor_fault("laser 2", "out of range"));
    }

    #[test]
    fn test_other_errors_propagate_immediately() {
        let mut rig = ScriptedRig {
            tilt: (0.0, 0.0),
            batches: vec![
                Err(LevelError::InvalidArgument("bad count".into())),
                Ok(vec![1.0, 1.0, 1.0]),
            ],
        };
        let err = estimator(2).read(&mut rig).unwrap_err();
        assert!(matches!(err, LevelError::InvalidArgument(_)));
        assert_eq!(rig.batches.len(), 1);
    }

    #[test]
    fn test_filter_persists_until_reset() {
        let mut est = StateEstimator::new(EstimatorConfig {
            samples: 1,
            ..EstimatorConfig::default()
        })
        .unwrap();
        let mut rig = ScriptedRig {
            tilt: (0.0, 0.0),
            batches: vec![Ok(vec![1.0; 3]), Ok(vec![1.0; 3])],
        };
        est.read(&mut rig).unwrap();
        let p_after_one = est.filter().variance();
        est.read(&mut rig).unwrap();
        assert!(est.filter().variance() < p_after_one);

        est.reset();
        assert_eq!(est.filter().variance(), 100.0);
        assert_eq!(est.last_min_raw(), None);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let config = EstimatorConfig {
            samples: 0,
            ..EstimatorConfig::default()
        };
        assert!(StateEstimator::new(config).is_err());
    }
}
