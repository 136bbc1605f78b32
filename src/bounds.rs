//! Axis-aligned bounding regions for tree nodes.

use num_traits::Bounded;

use crate::points::PointSet;
use crate::r#type::CoordNum;

/// A d-dimensional axis-aligned bounding box.
///
/// An empty box carries `max_value()` lower bounds and `min_value()` upper
/// bounds, so distance computations against it stay finite and every pruning
/// test against it succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct Aabb<N: CoordNum> {
    lower: Vec<N>,
    upper: Vec<N>,
}

impl<N: CoordNum> Aabb<N> {
    /// Create an empty bounding box with the given dimensionality.
    pub fn empty(dim: usize) -> Self {
        Self {
            lower: vec![<N as Bounded>::max_value(); dim],
            upper: vec![<N as Bounded>::min_value(); dim],
        }
    }

    /// The tight bounding box of a contiguous range of points in `points`.
    pub fn from_point_range(points: &PointSet<N>, start: usize, end: usize) -> Self {
        let mut bounds = Self::empty(points.dim());
        for i in start..end {
            bounds.expand(points.point(i));
        }
        bounds
    }

    /// Grow this box to cover `point`.
    pub fn expand(&mut self, point: &[N]) {
        debug_assert_eq!(point.len(), self.lower.len());
        for (d, &c) in point.iter().enumerate() {
            if c < self.lower[d] {
                self.lower[d] = c;
            }
            if c > self.upper[d] {
                self.upper[d] = c;
            }
        }
    }

    /// The dimensionality of this box.
    #[inline]
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Per-dimension lower bounds.
    #[inline]
    pub fn lower(&self) -> &[N] {
        &self.lower
    }

    /// Per-dimension upper bounds.
    #[inline]
    pub fn upper(&self) -> &[N] {
        &self.upper
    }

    /// Returns `true` if `point` lies within this box.
    pub fn contains(&self, point: &[N]) -> bool {
        point
            .iter()
            .enumerate()
            .all(|(d, &c)| c >= self.lower[d] && c <= self.upper[d])
    }
}
