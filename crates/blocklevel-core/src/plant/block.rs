//! Block physics
//!
//! Corner displacement under actuation:
//!
//! Δzᵢ = -p · k · (1 + ν)
//!
//! where p ∈ [0, 1] is the piston power, k the stiffness [mm per unit
//! power] and ν the relative actuation noise supplied by the caller.
//!
//! Tilt comes from the least-squares plane `z = a·x + b·y + c` through the
//! corners: `tilt_x = atan(-b)`, `tilt_y = atan(a)`. When the geometry is
//! degenerate the slopes are taken from finite differences along the edges.

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::math::{fit_plane, Plane};
use crate::LevelResult;

use super::{BlockGeometry, Corner, CornerSet};

/// Spans shorter than this are treated as zero in the fallback [mm]
const MIN_EDGE_SPAN: f64 = 1e-9;

/// Diagnostic classification of a corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CornerStatus {
    TooHigh,
    TooLow,
    Ok,
}

impl CornerStatus {
    /// Classify a height against a symmetric threshold [mm]
    pub fn classify(height: f64, threshold: f64) -> Self {
        if height > threshold {
            CornerStatus::TooHigh
        } else if height < -threshold {
            CornerStatus::TooLow
        } else {
            CornerStatus::Ok
        }
    }
}

/// Block physical parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockParams {
    /// Block dimensions
    pub geometry: BlockGeometry,
    /// Corner drop per unit piston power [mm]
    pub stiffness: f64,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self {
            geometry: BlockGeometry::default(),
            stiffness: 5.0,
        }
    }
}

/// Noise-free block model
#[derive(Debug, Clone)]
pub struct BlockDynamics {
    pub params: BlockParams,
}

impl BlockDynamics {
    pub fn new(params: BlockParams) -> Self {
        Self { params }
    }

    pub fn geometry(&self) -> &BlockGeometry {
        &self.params.geometry
    }

    /// Corner height change for a piston pulse [mm]
    ///
    /// `power` is expected in [0, 1]; non-positive power moves nothing.
    pub fn displacement(&self, power: f64, relative_noise: f64) -> f64 {
        if power <= 0.0 {
            return 0.0;
        }
        -power * self.params.stiffness * (1.0 + relative_noise)
    }

    /// Corner points `(x, y, z)` for plane fitting
    pub fn corner_points(&self, corners: &CornerSet) -> [Vector3<f64>; 4] {
        Corner::ALL.map(|c| {
            let p = self.geometry().corner_position(c);
            Vector3::new(p.x, p.y, corners[c])
        })
    }

    /// Least-squares plane through the four corners
    pub fn fit(&self, corners: &CornerSet) -> LevelResult<Plane> {
        fit_plane(&self.corner_points(corners))
    }

    /// Tilt `(tilt_x, tilt_y)` [rad]
    ///
    /// Uses the plane fit and falls back to [`Self::finite_difference_slopes`]
    /// when the fit is singular.
    pub fn tilt(&self, corners: &CornerSet) -> (f64, f64) {
        let (a, b) = match self.fit(corners) {
            Ok(plane) => (plane.a, plane.b),
            Err(e) => {
                debug!("plane fit unavailable ({e}), using edge finite differences");
                self.finite_difference_slopes(corners)
            }
        };
        slopes_to_tilt(a, b)
    }

    /// Slopes `(dz/dx, dz/dy)` from finite differences along the edges
    ///
    /// dz/dx is averaged over the parallel edges A→B and D→C. dz/dy is
    /// averaged over the side edges A→D and B→C after removing the x
    /// contribution `a·Δx`. Edges with zero span are skipped; a slope with
    /// no usable edge is 0.
    pub fn finite_difference_slopes(&self, corners: &CornerSet) -> (f64, f64) {
        let g = self.geometry();
        let pos = g.corner_positions();
        let z = corners.as_array();

        let slope = |from: Corner, to: Corner, dx_only: bool, a: f64| -> Option<f64> {
            let (i, j) = (from.index(), to.index());
            let d = pos[j] - pos[i];
            let dz = z[j] - z[i];
            if dx_only {
                (d.x.abs() > MIN_EDGE_SPAN).then(|| dz / d.x)
            } else {
                (d.y.abs() > MIN_EDGE_SPAN).then(|| (dz - a * d.x) / d.y)
            }
        };

        let a = average(
            [
                slope(Corner::A, Corner::B, true, 0.0),
                slope(Corner::D, Corner::C, true, 0.0),
            ]
            .into_iter()
            .flatten(),
        );
        let b = average(
            [
                slope(Corner::A, Corner::D, false, a),
                slope(Corner::B, Corner::C, false, a),
            ]
            .into_iter()
            .flatten(),
        );

        (a, b)
    }

    /// Inverse-distance weighted corner height [mm]
    ///
    /// wᵢ = 1 / (1 + |pᵢ|), with pᵢ the planar corner position.
    pub fn inverse_distance_height(&self, corners: &CornerSet) -> f64 {
        let (num, den) = corners.iter().fold((0.0, 0.0), |(num, den), (c, z)| {
            let w = 1.0 / (1.0 + self.geometry().corner_position(c).norm());
            (num + w * z, den + w)
        });
        num / den
    }

    /// Per-corner diagnostic classification
    pub fn corner_status(&self, corners: &CornerSet, threshold: f64) -> [CornerStatus; 4] {
        Corner::ALL.map(|c| CornerStatus::classify(corners[c], threshold))
    }
}

/// Convert plane slopes to tilt angles `(tilt_x, tilt_y)` [rad]
pub fn slopes_to_tilt(a: f64, b: f64) -> (f64, f64) {
    ((-b).atan(), a.atan())
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn planar_corners(geometry: &BlockGeometry, a: f64, b: f64, c: f64) -> CornerSet {
        let mut corners = CornerSet::default();
        for corner in Corner::ALL {
            let p = geometry.corner_position(corner);
            corners[corner] = a * p.x + b * p.y + c;
        }
        corners
    }

    fn dynamics_with(geometry: BlockGeometry) -> BlockDynamics {
        BlockDynamics::new(BlockParams {
            geometry,
            stiffness: 5.0,
        })
    }

    #[test]
    fn test_displacement_lowers_corner() {
        let dynamics = BlockDynamics::new(BlockParams::default());
        assert_relative_eq!(dynamics.displacement(0.5, 0.0), -2.5);
        assert_relative_eq!(dynamics.displacement(0.5, 0.2), -3.0);
        assert_eq!(dynamics.displacement(0.0, 0.2), 0.0);
        assert_eq!(dynamics.displacement(-1.0, 0.0), 0.0);
    }

    #[test]
    fn test_tilt_from_exact_plane() {
        let geometry = BlockGeometry::default();
        let dynamics = dynamics_with(geometry);
        let corners = planar_corners(&geometry, 0.004, -0.003, 1.5);

        let (tilt_x, tilt_y) = dynamics.tilt(&corners);
        assert_relative_eq!(tilt_x, 0.003_f64.atan(), epsilon = 1e-12);
        assert_relative_eq!(tilt_y, 0.004_f64.atan(), epsilon = 1e-12);
    }

    #[test]
    fn test_finite_difference_matches_fit_for_planes() {
        let geometry = BlockGeometry::default();
        let dynamics = dynamics_with(geometry);
        let corners = planar_corners(&geometry, -0.01, 0.02, -4.0);

        let (a, b) = dynamics.finite_difference_slopes(&corners);
        assert_relative_eq!(a, -0.01, epsilon = 1e-12);
        assert_relative_eq!(b, 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_width_falls_back() {
        // All corners on the x axis: the plane fit is singular
        let geometry = BlockGeometry::new(0.0, 300.0, 400.0).unwrap();
        let dynamics = dynamics_with(geometry);
        let corners = planar_corners(&geometry, 0.01, 0.0, 2.0);

        assert!(dynamics.fit(&corners).is_err());

        let (tilt_x, tilt_y) = dynamics.tilt(&corners);
        assert_relative_eq!(tilt_x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(tilt_y, 0.01_f64.atan(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_length_falls_back() {
        // All corners on the y axis
        let geometry = BlockGeometry::new(300.0, 0.0, 0.0).unwrap();
        let dynamics = dynamics_with(geometry);
        let corners = planar_corners(&geometry, 0.0, -0.02, 0.0);

        assert!(dynamics.fit(&corners).is_err());

        let (tilt_x, tilt_y) = dynamics.tilt(&corners);
        assert_relative_eq!(tilt_x, 0.02_f64.atan(), epsilon = 1e-12);
        assert_relative_eq!(tilt_y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fully_degenerate_block_is_level() {
        let geometry = BlockGeometry::new(0.0, 0.0, 0.0).unwrap();
        let dynamics = dynamics_with(geometry);
        let corners = CornerSet::new([1.0, 2.0, 3.0, 4.0]);

        assert_eq!(dynamics.tilt(&corners), (0.0, 0.0));
    }

    #[test]
    fn test_inverse_distance_height_of_flat_block() {
        let dynamics = BlockDynamics::new(BlockParams::default());
        assert_relative_eq!(
            dynamics.inverse_distance_height(&CornerSet::uniform(3.25)),
            3.25,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_corner_status_threshold() {
        let dynamics = BlockDynamics::new(BlockParams::default());
        let status = dynamics.corner_status(&CornerSet::new([2.5, -2.5, 2.0, 0.0]), 2.0);
        assert_eq!(
            status,
            [
                CornerStatus::TooHigh,
                CornerStatus::TooLow,
                CornerStatus::Ok,
                CornerStatus::Ok
            ]
        );
    }
}
