//! A degenerate index that never reorders its point set.
//!
//! [`LinearIndex`] presents the whole dataset as a single leaf, so every
//! traversal over it degrades to a linear scan. It exists for two reasons:
//! it is the simplest possible [`SpatialIndex`] implementation, and its
//! `rearranges_dataset() == false` capability exercises the orchestrator's
//! remap-free path, which must be observationally identical to the
//! remapping one.

use std::ops::Range;

use crate::bounds::Aabb;
use crate::index::{IndexNode, SpatialIndex};
use crate::points::PointSet;
use crate::r#type::CoordNum;

/// A single-leaf index over a [`PointSet`], in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearIndex<N: CoordNum> {
    points: PointSet<N>,
    identity: Vec<usize>,
    bounds: Aabb<N>,
}

impl<N: CoordNum> LinearIndex<N> {
    /// Wrap `points` without reordering them.
    pub fn new(points: PointSet<N>) -> Self {
        let bounds = Aabb::from_point_range(&points, 0, points.len());
        let identity = (0..points.len()).collect();
        Self {
            points,
            identity,
            bounds,
        }
    }
}

impl<N: CoordNum> SpatialIndex<N> for LinearIndex<N> {
    type Node<'t>
        = LinearNode<'t, N>
    where
        Self: 't;

    fn from_point_set(points: PointSet<N>) -> Self {
        Self::new(points)
    }

    fn points(&self) -> &PointSet<N> {
        &self.points
    }

    fn rearranges_dataset(&self) -> bool {
        false
    }

    fn old_from_new(&self) -> &[usize] {
        &self.identity
    }

    fn root(&self) -> LinearNode<'_, N> {
        LinearNode { index: self }
    }
}

/// The root (and only) node of a [`LinearIndex`].
#[derive(Debug, Clone)]
pub struct LinearNode<'a, N: CoordNum> {
    index: &'a LinearIndex<N>,
}

impl<N: CoordNum> IndexNode<N> for LinearNode<'_, N> {
    fn bounds(&self) -> &Aabb<N> {
        &self.index.bounds
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn children(&self) -> Option<(Self, Self)> {
        None
    }

    fn points(&self) -> Range<usize> {
        0..self.index.points.len()
    }
}
