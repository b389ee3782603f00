//! Least-squares linear algebra
//!
//! Two solves share the SVD:
//!
//! - The control law inverts the 3×4 response matrix with the Moore–Penrose
//!   pseudoinverse, giving the minimum-norm power vector when the system is
//!   under-determined (3 state equations, 4 pistons).
//! - Tilt sensing fits a plane `z = a·x + b·y + c` through the corner points.
//!
//! Rank deficiency is judged from the singular values relative to σ_max
//! instead of a determinant test.

use nalgebra::{DMatrix, DVector, Matrix4x3, Vector3};

use crate::{LevelError, LevelResult, Powers, ResponseMatrix, StateVec};

/// Relative singular value cut-off for the pseudoinverse (times σ_max)
const PINV_RCOND: f64 = 4.0 * f64::EPSILON;

/// Relative singular value cut-off below which a plane fit is singular
const PLANE_RCOND: f64 = 1e-10;

/// Moore–Penrose pseudoinverse of a response matrix
///
/// Singular values below `4·ε·σ_max` are treated as zero, so rank-deficient
/// and all-zero matrices still produce a finite inverse. Matrices holding
/// NaN or infinity map to the zero matrix.
pub fn pseudo_inverse(m: &ResponseMatrix) -> Matrix4x3<f64> {
    if m.iter().any(|v| !v.is_finite()) {
        return Matrix4x3::zeros();
    }

    let svd = m.svd(true, true);
    let eps = PINV_RCOND * svd.singular_values.max();

    svd.pseudo_inverse(eps).unwrap_or_else(|_| Matrix4x3::zeros())
}

/// Minimum-norm least-squares solution of `R·x = Δ`
pub fn solve_min_norm(response: &ResponseMatrix, target: &StateVec) -> Powers {
    pseudo_inverse(response) * target
}

/// Plane `z = a·x + b·y + c`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Slope along x (dz/dx)
    pub a: f64,
    /// Slope along y (dz/dy)
    pub b: f64,
    /// Height at the origin
    pub c: f64,
}

impl Plane {
    /// Height of the plane at (x, y)
    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y + self.c
    }
}

/// Least-squares plane through points `(x, y, z)`
///
/// Needs at least three non-collinear points. A rank-deficient design
/// matrix is reported as [`LevelError::SingularResponse`] so callers can
/// fall back to a cheaper slope estimate.
pub fn fit_plane(points: &[Vector3<f64>]) -> LevelResult<Plane> {
    let n = points.len();
    if n < 3 {
        return Err(LevelError::SingularResponse(format!(
            "plane fit needs at least 3 points, got {n}"
        )));
    }

    // Design matrix rows: [x, y, 1]
    let design = DMatrix::from_fn(n, 3, |i, j| match j {
        0 => points[i].x,
        1 => points[i].y,
        _ => 1.0,
    });
    let z = DVector::from_fn(n, |i, _| points[i].z);

    let svd = design.svd(true, true);
    let sigma_max = svd.singular_values.max();
    let sigma_min = svd.singular_values.min();

    if !sigma_max.is_finite() || sigma_max <= 0.0 || sigma_min <= PLANE_RCOND * sigma_max {
        return Err(LevelError::SingularResponse(format!(
            "plane fit design matrix is rank deficient (σ_min={sigma_min:.3e}, σ_max={sigma_max:.3e})"
        )));
    }

    let coeffs = svd
        .solve(&z, PLANE_RCOND * sigma_max)
        .map_err(|e| LevelError::SingularResponse(e.to_string()))?;

    Ok(Plane {
        a: coeffs[0],
        b: coeffs[1],
        c: coeffs[2],
    })
}
