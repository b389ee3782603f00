//! Online system identification
//!
//! Estimates how each corner piston moves the block state by pulsing one
//! corner at a time and measuring the change.

pub mod response;

pub use response::*;
