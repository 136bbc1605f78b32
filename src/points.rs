//! Flat, row-major storage for sets of d-dimensional points.

use crate::r#type::CoordNum;

/// A set of d-dimensional points backed by a single flat buffer.
///
/// Point `i` occupies `coords[i * dim..(i + 1) * dim]`. The buffer is not
/// mutated after construction except by index builders, which may physically
/// reorder whole points while recording the permutation they applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet<N: CoordNum> {
    coords: Vec<N>,
    dim: usize,
}

impl<N: CoordNum> PointSet<N> {
    /// Create an empty point set with the given dimensionality.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "point sets must have at least one dimension");
        Self { coords: vec![], dim }
    }

    /// Create a point set from a flat coordinate buffer.
    ///
    /// The buffer length must be a multiple of `dim`.
    pub fn from_flat(coords: Vec<N>, dim: usize) -> Self {
        assert!(dim > 0, "point sets must have at least one dimension");
        assert_eq!(
            coords.len() % dim,
            0,
            "flat buffer of {} coordinates is not a whole number of {}-dimensional points",
            coords.len(),
            dim
        );
        Self { coords, dim }
    }

    /// The dimensionality of every point in this set.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The number of points in this set.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len() / self.dim
    }

    /// Returns `true` if this set contains no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// The coordinates of point `index`.
    #[inline]
    pub fn point(&self, index: usize) -> &[N] {
        &self.coords[index * self.dim..(index + 1) * self.dim]
    }

    /// Append a point to this set.
    pub fn push(&mut self, coords: &[N]) -> usize {
        assert_eq!(
            coords.len(),
            self.dim,
            "expected a {}-dimensional point, got {} coordinates",
            self.dim,
            coords.len()
        );
        self.coords.extend_from_slice(coords);
        self.len() - 1
    }

    /// Iterate over the points in this set.
    pub fn iter(&self) -> impl Iterator<Item = &[N]> {
        self.coords.chunks_exact(self.dim)
    }

    /// The raw flat coordinate buffer.
    pub fn as_flat(&self) -> &[N] {
        &self.coords
    }

    /// Swap two whole points in place. Used by index builders that reorder
    /// their dataset.
    #[inline]
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for d in 0..self.dim {
            self.coords.swap(a * self.dim + d, b * self.dim + d);
        }
    }

    /// A single coordinate, avoiding the slice round-trip in hot loops.
    #[inline]
    pub(crate) fn coord(&self, index: usize, axis: usize) -> N {
        self.coords[index * self.dim + axis]
    }
}
