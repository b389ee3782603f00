//! Rig capability interface
//!
//! The control loop talks to the block only through [`LevelingRig`]. The
//! simulator ([`crate::simulation::SimulatedBlock`]) and hardware adapters
//! both implement it, and the leveler takes whichever it is given.

use std::thread;
use std::time::Duration;

use crate::plant::{Corner, CornerSet};
use crate::LevelResult;

/// Sensors and actuators of a leveling rig
pub trait LevelingRig {
    /// Current tilt `(tilt_x, tilt_y)` [rad]
    fn read_tilt(&mut self) -> LevelResult<(f64, f64)>;

    /// One raw height reading per sensor [mm]
    ///
    /// Fails with [`crate::LevelError::SensorFault`] when a sensor has no
    /// valid reading.
    fn read_raw_height_samples(&mut self, sensor_count: usize) -> LevelResult<Vec<f64>>;

    /// Pulse one corner piston with `power` in [0, 1]
    ///
    /// Blocks until the command is issued; the caller waits for settling.
    fn actuate(&mut self, corner: Corner, power: f64) -> LevelResult<()>;

    /// Number of height sensors
    fn sensor_count(&self) -> usize;

    /// Ground-truth corner heights, if the rig knows them
    fn corner_heights(&self) -> Option<CornerSet> {
        None
    }
}

impl<T: LevelingRig + ?Sized> LevelingRig for &mut T {
    fn read_tilt(&mut self) -> LevelResult<(f64, f64)> {
        (**self).read_tilt()
    }

    fn read_raw_height_samples(&mut self, sensor_count: usize) -> LevelResult<Vec<f64>> {
        (**self).read_raw_height_samples(sensor_count)
    }

    fn actuate(&mut self, corner: Corner, power: f64) -> LevelResult<()> {
        (**self).actuate(corner, power)
    }

    fn sensor_count(&self) -> usize {
        (**self).sensor_count()
    }

    fn corner_heights(&self) -> Option<CornerSet> {
        (**self).corner_heights()
    }
}

/// Block the thread for `duration`; zero durations return immediately
pub fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
