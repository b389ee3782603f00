//! Plant model for blocklevel
//!
//! Noise-free physics of the trapezoidal block:
//! - Geometry (corner coordinates, long edges, laser mounts)
//! - Corner displacement under piston actuation
//! - Tilt from a least-squares plane fit, with a finite-difference fallback
//! - Height at laser positions and inverse-distance weighted height
//!
//! Noise is layered on top by [`crate::simulation`].

pub mod geometry;
pub mod block;

pub use geometry::*;
pub use block::*;
