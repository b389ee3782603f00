//! Mathematical utilities for blocklevel
//!
//! Least-squares tools built on the SVD (pseudoinverse, plane fit) and the
//! small robust statistics used by height fusion.

pub mod linalg;
pub mod stats;

pub use linalg::*;
pub use stats::*;
