//! Block simulation
//!
//! Seeded, noisy stand-in for the leveling hardware. The simulator wraps the
//! noise-free [`crate::plant::BlockDynamics`] and adds actuation noise,
//! sensor noise and optional sensor-fault injection.

pub mod config;
pub mod noise;
pub mod simulator;

pub use config::*;
pub use noise::*;
pub use simulator::*;
