use std::cmp;

use tinyvec::TinyVec;

use crate::bounds::Aabb;
use crate::kdtree::index::{KdTree, NodeData};
use crate::points::PointSet;
use crate::r#type::CoordNum;

const DEFAULT_NODE_SIZE: usize = 16;

/// A builder to create a [`KdTree`].
pub struct KdTreeBuilder<N: CoordNum> {
    points: PointSet<N>,
    node_size: usize,
}

impl<N: CoordNum> KdTreeBuilder<N> {
    /// Create a new builder for points of the provided dimensionality.
    pub fn new(dim: usize) -> Self {
        Self::from_point_set(PointSet::new(dim))
    }

    /// Create a builder seeded with an existing point set.
    pub fn from_point_set(points: PointSet<N>) -> Self {
        Self {
            points,
            node_size: DEFAULT_NODE_SIZE,
        }
    }

    /// Override the maximum number of points per leaf.
    pub fn with_node_size(mut self, node_size: usize) -> Self {
        assert!(node_size >= 1, "node size must be at least 1");
        self.node_size = node_size;
        self
    }

    /// Add a point to the index. Returns its insertion index, which is how
    /// search results will refer to it.
    pub fn add(&mut self, point: &[N]) -> usize {
        self.points.push(point)
    }

    /// Consume this builder, performing the k-d sort and generating a tree
    /// ready for traversal.
    ///
    /// Sorting physically reorders the point buffer; the returned tree's
    /// `old_from_new` record maps every internal position back to the
    /// insertion index of the point now stored there.
    pub fn finish(self) -> KdTree<N> {
        let mut points = self.points;
        let dim = points.dim();
        let num_points = points.len();
        let mut ids: Vec<usize> = (0..num_points).collect();

        let mut nodes: Vec<NodeData<N>> = vec![NodeData::default()];

        // Worklist of (start, end, axis, node slot) still to be built.
        let mut stack: TinyVec<[(usize, usize, usize, usize); 16]> = TinyVec::new();
        stack.push((0, num_points, 0, 0));

        while let Some((start, end, axis, slot)) = stack.pop() {
            let bounds = Aabb::from_point_range(&points, start, end);

            if end - start <= self.node_size {
                nodes[slot] = NodeData {
                    start,
                    end,
                    bounds,
                    children: None,
                };
                continue;
            }

            // Partition around the median on this axis so the halves recurse
            // on balanced, contiguous ranges.
            let mid = (start + end) >> 1;
            select(&mut ids, &mut points, mid, start, end - 1, axis);

            let left = nodes.len();
            nodes.push(NodeData::default());
            nodes.push(NodeData::default());
            nodes[slot] = NodeData {
                start,
                end,
                bounds,
                children: Some((left, left + 1)),
            };

            let next_axis = (axis + 1) % dim;
            stack.push((start, mid, next_axis, left));
            stack.push((mid, end, next_axis, left + 1));
        }

        KdTree {
            points,
            old_from_new: ids,
            nodes,
            node_size: self.node_size,
        }
    }
}

/// Custom Floyd-Rivest selection algorithm: sort ids and points so that
/// [left..k-1] items are smaller than the k-th item on the given axis.
#[inline]
fn select<N: CoordNum>(
    ids: &mut [usize],
    points: &mut PointSet<N>,
    k: usize,
    mut left: usize,
    mut right: usize,
    axis: usize,
) {
    while right > left {
        if right - left > 600 {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = f64::ln(n);
            let s = 0.5 * f64::exp((2.0 * z) / 3.0);
            let sd = 0.5
                * f64::sqrt((z * s * (n - s)) / n)
                * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
            let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
            let new_right = cmp::min(
                right,
                f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
            );
            select(ids, points, k, new_left, new_right, axis);
        }

        let t = points.coord(k, axis);
        let mut i = left;
        let mut j = right;

        swap_item(ids, points, left, k);
        if points.coord(right, axis) > t {
            swap_item(ids, points, left, right);
        }

        while i < j {
            swap_item(ids, points, i, j);
            i += 1;
            j -= 1;
            while points.coord(i, axis) < t {
                i += 1;
            }
            while points.coord(j, axis) > t {
                j -= 1;
            }
        }

        if points.coord(left, axis) == t {
            swap_item(ids, points, left, j);
        } else {
            j += 1;
            swap_item(ids, points, j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            right = j.saturating_sub(1);
        }
    }
}

#[inline]
fn swap_item<N: CoordNum>(ids: &mut [usize], points: &mut PointSet<N>, i: usize, j: usize) {
    ids.swap(i, j);
    points.swap(i, j);
}
