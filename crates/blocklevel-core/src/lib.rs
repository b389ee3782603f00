//! # Blocklevel Core
//!
//! Closed-loop leveling of a rigid trapezoidal block resting on four
//! independently actuated corner pistons (A–D).
//!
//! The controller drives the block toward zero tilt and zero height offset
//! against an adjacent reference surface by repeatedly identifying how each
//! piston moves the block and inverting that response.
//!
//! ## Modules
//!
//! - [`math`]: Linear algebra helpers (pseudoinverse, plane fit, robust statistics)
//! - [`plant`]: Block geometry, corner sets and the noise-free block physics
//! - [`simulation`]: Seeded, noisy block simulator used in place of hardware
//! - [`rig`]: Capability interface shared by the simulator and real hardware
//! - [`estimation`]: State estimator with median fusion and recursive height filter
//! - [`identification`]: Perturb-and-measure response matrix identification
//! - [`control`]: Pseudoinverse control law and the leveling state machine

pub mod error;
pub mod math;
pub mod plant;
pub mod simulation;
pub mod rig;
pub mod estimation;
pub mod identification;
pub mod control;

pub use error::{LevelError, LevelResult};
pub use rig::LevelingRig;

use nalgebra::{Matrix3x4, Vector3, Vector4};

/// State vector [tilt_x rad, tilt_y rad, height mm]
pub type StateVec = Vector3<f64>;

/// Per-corner actuator powers, ordered A, B, C, D
pub type Powers = Vector4<f64>;

/// Response matrix: rows are state dimensions, columns are corners
pub type ResponseMatrix = Matrix3x4<f64>;

/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Number of actuated corners
pub const NUM_CORNERS: usize = 4;
