use std::ops::Range;

use crate::bounds::Aabb;
use crate::index::{IndexNode, SpatialIndex};
use crate::kdtree::KdTreeBuilder;
use crate::points::PointSet;
use crate::r#type::CoordNum;

/// A balanced binary k-d tree over a [`PointSet`].
///
/// Construction reorders the point buffer so that every node covers a
/// contiguous range of positions; the permutation applied is recorded and
/// exposed through [`SpatialIndex::old_from_new`]. Leaves hold at most
/// `node_size` points and internal nodes hold none, so the leaves partition
/// the whole set.
#[derive(Debug, Clone, PartialEq)]
pub struct KdTree<N: CoordNum> {
    pub(crate) points: PointSet<N>,
    pub(crate) old_from_new: Vec<usize>,
    pub(crate) nodes: Vec<NodeData<N>>,
    pub(crate) node_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NodeData<N: CoordNum> {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) bounds: Aabb<N>,
    pub(crate) children: Option<(usize, usize)>,
}

impl<N: CoordNum> Default for NodeData<N> {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            bounds: Aabb::empty(0),
            children: None,
        }
    }
}

impl<N: CoordNum> KdTree<N> {
    /// Build a tree over `points` with the default node size.
    pub fn build(points: PointSet<N>) -> Self {
        KdTreeBuilder::from_point_set(points).finish()
    }

    /// The maximum number of points per leaf of this tree.
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// The number of indexed points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}

impl<N: CoordNum> SpatialIndex<N> for KdTree<N> {
    type Node<'t>
        = KdNode<'t, N>
    where
        Self: 't;

    fn from_point_set(points: PointSet<N>) -> Self {
        Self::build(points)
    }

    fn points(&self) -> &PointSet<N> {
        &self.points
    }

    fn rearranges_dataset(&self) -> bool {
        true
    }

    fn old_from_new(&self) -> &[usize] {
        &self.old_from_new
    }

    fn root(&self) -> KdNode<'_, N> {
        KdNode {
            tree: self,
            node: 0,
        }
    }
}

/// A node in a [`KdTree`].
#[derive(Debug, Clone)]
pub struct KdNode<'a, N: CoordNum> {
    /// The tree that this node is a reference onto.
    tree: &'a KdTree<N>,
    /// Position of this node's record in the tree's node table.
    node: usize,
}

impl<N: CoordNum> KdNode<'_, N> {
    #[inline]
    fn data(&self) -> &NodeData<N> {
        &self.tree.nodes[self.node]
    }
}

impl<N: CoordNum> IndexNode<N> for KdNode<'_, N> {
    fn bounds(&self) -> &Aabb<N> {
        &self.data().bounds
    }

    fn is_leaf(&self) -> bool {
        self.data().children.is_none()
    }

    fn children(&self) -> Option<(Self, Self)> {
        self.data().children.map(|(left, right)| {
            (
                KdNode {
                    tree: self.tree,
                    node: left,
                },
                KdNode {
                    tree: self.tree,
                    node: right,
                },
            )
        })
    }

    fn points(&self) -> Range<usize> {
        let data = self.data();
        data.start..data.end
    }
}
