//! Block geometry
//!
//! The block is a trapezoid centred on the origin, with the short parallel
//! edge A–B at the bottom and the long parallel edge D–C at the top:
//!
//! ```text
//!        D ─────────── length_long ─────────── C      y = +w/2
//!         \                                   /
//!          A ──────── length_short ──────── B         y = -w/2
//! ```
//!
//! All lengths are in millimetres.

use std::fmt;
use std::ops::{Index, IndexMut};

use nalgebra::{Vector2, Vector4};
use serde::{Deserialize, Serialize};

use crate::{LevelError, LevelResult, MM_PER_INCH, NUM_CORNERS};

/// Actuated corner of the block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
}

impl Corner {
    /// All corners in actuation order
    pub const ALL: [Corner; NUM_CORNERS] = [Corner::A, Corner::B, Corner::C, Corner::D];

    /// Column / array index of this corner
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Corner::A => "A",
            Corner::B => "B",
            Corner::C => "C",
            Corner::D => "D",
        }
    }
}

impl TryFrom<usize> for Corner {
    type Error = LevelError;

    fn try_from(index: usize) -> LevelResult<Self> {
        Corner::ALL.get(index).copied().ok_or_else(|| {
            LevelError::InvalidArgument(format!("corner index {index} out of range 0..{NUM_CORNERS}"))
        })
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Heights of the four corners [mm], relative to the reference surface
///
/// Serialized as a plain `[A, B, C, D]` array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CornerSet {
    heights: [f64; NUM_CORNERS],
}

impl CornerSet {
    pub fn new(heights: [f64; NUM_CORNERS]) -> Self {
        Self { heights }
    }

    /// All corners at the same height
    pub fn uniform(height: f64) -> Self {
        Self::new([height; NUM_CORNERS])
    }

    pub fn as_array(&self) -> [f64; NUM_CORNERS] {
        self.heights
    }

    pub fn to_vector(&self) -> Vector4<f64> {
        Vector4::from(self.heights)
    }

    /// Iterate `(corner, height)` pairs in corner order
    pub fn iter(&self) -> impl Iterator<Item = (Corner, f64)> + '_ {
        Corner::ALL.iter().map(move |&c| (c, self.heights[c.index()]))
    }

    /// Lowest corner height
    pub fn min(&self) -> f64 {
        self.heights.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest absolute deviation from the reference surface
    pub fn max_abs_deviation(&self) -> f64 {
        self.heights.iter().map(|h| h.abs()).fold(0.0, f64::max)
    }
}

impl Index<Corner> for CornerSet {
    type Output = f64;

    fn index(&self, corner: Corner) -> &f64 {
        &self.heights[corner.index()]
    }
}

impl IndexMut<Corner> for CornerSet {
    fn index_mut(&mut self, corner: Corner) -> &mut f64 {
        &mut self.heights[corner.index()]
    }
}

/// One of the two parallel edges of the trapezoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LongEdge {
    /// Short parallel edge A → B
    Near,
    /// Long parallel edge D → C
    Far,
}

impl LongEdge {
    /// Start and end corner of the edge
    pub fn endpoints(self) -> (Corner, Corner) {
        match self {
            LongEdge::Near => (Corner::A, Corner::B),
            LongEdge::Far => (Corner::D, Corner::C),
        }
    }
}

/// Laser ranging sensor position on a long edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaserMount {
    /// Edge the laser looks at
    pub edge: LongEdge,
    /// Position along the edge, 0 at the start corner, 1 at the end corner
    pub fraction: f64,
}

impl LaserMount {
    pub fn new(edge: LongEdge, fraction: f64) -> Self {
        Self { edge, fraction }
    }

    /// Height under the laser, interpolated between the edge corners
    pub fn height(&self, corners: &CornerSet) -> f64 {
        let (start, end) = self.edge.endpoints();
        corners[start] + self.fraction * (corners[end] - corners[start])
    }
}

/// Block dimensions [mm]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockGeometry {
    /// Distance between the two parallel edges
    pub width: f64,
    /// Length of edge A–B
    pub length_short: f64,
    /// Length of edge D–C
    pub length_long: f64,
}

impl Default for BlockGeometry {
    fn default() -> Self {
        // 12" x 14"/16" trapezoid
        Self {
            width: 12.0 * MM_PER_INCH,
            length_short: 14.0 * MM_PER_INCH,
            length_long: 16.0 * MM_PER_INCH,
        }
    }
}

impl BlockGeometry {
    /// Create geometry from millimetre dimensions
    ///
    /// Dimensions must be finite and non-negative. Zero dimensions are
    /// accepted and give a degenerate block (see [`Self::is_degenerate`]).
    pub fn new(width: f64, length_short: f64, length_long: f64) -> LevelResult<Self> {
        let geometry = Self {
            width,
            length_short,
            length_long,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Create geometry from inch dimensions
    pub fn from_inches(width: f64, length_short: f64, length_long: f64) -> LevelResult<Self> {
        Self::new(
            width * MM_PER_INCH,
            length_short * MM_PER_INCH,
            length_long * MM_PER_INCH,
        )
    }

    pub fn validate(&self) -> LevelResult<()> {
        for (name, value) in [
            ("width", self.width),
            ("length_short", self.length_short),
            ("length_long", self.length_long),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LevelError::InvalidArgument(format!(
                    "geometry {name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Planar position of a corner [mm]
    pub fn corner_position(&self, corner: Corner) -> Vector2<f64> {
        let half_w = self.width / 2.0;
        match corner {
            Corner::A => Vector2::new(-self.length_short / 2.0, -half_w),
            Corner::B => Vector2::new(self.length_short / 2.0, -half_w),
            Corner::C => Vector2::new(self.length_long / 2.0, half_w),
            Corner::D => Vector2::new(-self.length_long / 2.0, half_w),
        }
    }

    /// Planar positions of all corners in corner order
    pub fn corner_positions(&self) -> [Vector2<f64>; NUM_CORNERS] {
        Corner::ALL.map(|c| self.corner_position(c))
    }

    /// Planar position of a laser mount
    pub fn mount_position(&self, mount: &LaserMount) -> Vector2<f64> {
        let (start, end) = mount.edge.endpoints();
        let p0 = self.corner_position(start);
        let p1 = self.corner_position(end);
        p0 + (p1 - p0) * mount.fraction
    }

    /// Whether the corners are collinear (no plane can be fitted)
    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || (self.length_short == 0.0 && self.length_long == 0.0)
    }
}
