//! State estimation
//!
//! - [`state`]: Leveling state and tolerances
//! - [`height_filter`]: Scalar recursive filter for the fused height
//! - [`estimator`]: Tilt pass-through plus median-fused, filtered height

pub mod state;
pub mod height_filter;
pub mod estimator;

pub use state::*;
pub use height_filter::*;
pub use estimator::*;
