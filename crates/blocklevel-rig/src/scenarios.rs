//! Canned leveling scenarios

use clap::ValueEnum;

use blocklevel_core::control::{LevelerConfig, StepScaling};
use blocklevel_core::estimation::Tolerance;
use blocklevel_core::plant::{BlockGeometry, Corner, CornerSet};
use blocklevel_core::simulation::PlantConfig;

use crate::config::RigConfig;

/// Safety floor of the reference scenario [mm]
///
/// Fifty iterations sink the plate 30 to 46 mm.
pub const REFERENCE_FLOOR_MM: f64 = -60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// 12" x 14"/16" trapezoid from corners [10, -5, 8, -3] mm
    Reference,
    /// Gently tilted, raised block settling into a tight tolerance
    Settle,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::Reference, Scenario::Settle];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Reference => "reference",
            Scenario::Settle => "settle",
        }
    }

    /// Session configuration for this scenario
    pub fn config(self, seed: u64) -> RigConfig {
        match self {
            Scenario::Reference => reference(seed),
            Scenario::Settle => settle(seed),
        }
    }
}

/// Trapezoid with one corner pair far below the reference surface
///
/// Pistons only lower corners, so the block cannot come back up to zero
/// height; the run ends at the iteration budget above [`REFERENCE_FLOOR_MM`].
fn reference(seed: u64) -> RigConfig {
    let plant = PlantConfig {
        initial_heights: CornerSet::new([10.0, -5.0, 8.0, -3.0]),
        seed,
        ..PlantConfig::default()
    };
    let leveler = LevelerConfig {
        tolerance: Tolerance {
            tilt_x: 0.001,
            tilt_y: 0.001,
            height: 0.1,
            corner: 1.0,
        },
        gain: 0.5,
        test_power: 0.1,
        max_iterations: 50,
        low_limit: REFERENCE_FLOOR_MM,
        step_scaling: StepScaling::Normalize,
        ..LevelerConfig::default()
    };

    RigConfig {
        plant,
        leveler,
        ..RigConfig::default()
    }
}

/// Block resting on the plane z = 4 + 0.003·x + 0.002·y [mm]
fn settle(seed: u64) -> RigConfig {
    let geometry = BlockGeometry::default();
    let mut initial = CornerSet::default();
    for corner in Corner::ALL {
        let p = geometry.corner_position(corner);
        initial[corner] = 4.0 + 0.003 * p.x + 0.002 * p.y;
    }

    let mut config = RigConfig::default();

    config.plant.initial_heights = initial;
    config.plant.seed = seed;
    config.plant.actuation_noise = 0.0;
    config.plant.sensors.laser_noise_std = 0.01;
    config.plant.sensors.fusion_noise_std = 0.0;

    config.estimator.filter.measurement_noise = 0.002;

    config.leveler.tolerance = Tolerance {
        tilt_x: 0.0005,
        tilt_y: 0.0005,
        height: 0.5,
        corner: 1.0,
    };
    config.leveler.gain = 0.5;
    config.leveler.step_scaling = StepScaling::Clamp;

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenarios_are_valid() {
        for scenario in Scenario::ALL {
            assert!(scenario.config(1).validate().is_ok(), "{}", scenario.name());
        }
    }

    #[test]
    fn test_settle_starts_raised() {
        let z = Scenario::Settle.config(0).plant.initial_heights;
        assert!(z.iter().all(|(_, h)| (3.0..5.0).contains(&h)));
        assert!(z[Corner::C] > z[Corner::A]);
    }
}
