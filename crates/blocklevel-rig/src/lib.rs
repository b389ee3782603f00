//! # Blocklevel Rig
//!
//! Boundary pieces around [`blocklevel_core`]:
//!
//! - [`codec`]: Tilt-sensor packet and ranging block decoding
//! - [`hardware`]: [`blocklevel_core::LevelingRig`] adapter over byte transports
//! - [`config`]: JSON configuration for a full leveling session
//! - [`scenarios`]: Canned simulation scenarios

pub mod codec;
pub mod hardware;
pub mod config;
pub mod scenarios;

pub use config::{ConfigError, RigConfig};
pub use hardware::HardwareRig;
