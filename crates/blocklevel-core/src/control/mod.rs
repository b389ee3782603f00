//! Leveling control
//!
//! - [`config`]: Controller configuration
//! - [`solver`]: Pseudoinverse control law and power projection
//! - [`leveler`]: Identify / solve / actuate / evaluate state machine

pub mod config;
pub mod solver;
pub mod leveler;

pub use config::*;
pub use solver::*;
pub use leveler::*;
