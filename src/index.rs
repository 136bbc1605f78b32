//! The capability contract a spatial index must satisfy, and the traversal
//! entry points shared by every index implementation.
//!
//! Traversals are double-dispatched: the index owns the iteration order over
//! nodes, while a [`TraversalRule`] owns every pruning and scoring decision.
//! A rule sees internal (possibly reordered) point positions; translating
//! them back to caller-facing positions is the orchestrator's job.

use std::ops::Range;

use crate::bounds::Aabb;
use crate::points::PointSet;
use crate::r#type::CoordNum;

/// A handle onto one node of a spatial index.
pub trait IndexNode<N: CoordNum>: Clone {
    /// The bounding region of every point below this node.
    fn bounds(&self) -> &Aabb<N>;

    /// Returns `true` if this is a leaf node without children.
    fn is_leaf(&self) -> bool;

    /// The two children of this node, or `None` for a leaf.
    fn children(&self) -> Option<(Self, Self)>;

    /// The contiguous range of internal point positions held by this leaf.
    ///
    /// Only leaves hold points directly; for an internal node this is the
    /// range covered by all of its descendants.
    fn points(&self) -> Range<usize>;
}

/// The decision-making half of a traversal.
///
/// `base_case` receives internal point positions of the query and reference
/// sets the rule was constructed over. The traversals guarantee each
/// (query, reference) pair reaches `base_case` at most once: leaves hold
/// disjoint point ranges and children partition their parent, so no
/// leaf pair can be visited twice.
pub trait TraversalRule<N: CoordNum, T: SpatialIndex<N>> {
    /// Evaluate a single (query point, reference point) pair.
    fn base_case(&mut self, query: usize, reference: usize);

    /// Returns `false` to prune `node` and its whole subtree for `query`.
    fn descend_point<'t>(&self, query: usize, node: &T::Node<'t>) -> bool
    where
        T: 't;

    /// Returns `false` to prune the (query node, reference node) pair.
    fn descend_pair<'t>(&self, query: &T::Node<'t>, reference: &T::Node<'t>) -> bool
    where
        T: 't;
}

/// A space-partitioning index over a [`PointSet`].
pub trait SpatialIndex<N: CoordNum>: Sized {
    /// The node handle type for this index.
    type Node<'t>: IndexNode<N>
    where
        Self: 't;

    /// Build an index over `points`, with default construction parameters.
    fn from_point_set(points: PointSet<N>) -> Self;

    /// The indexed point set, in internal (possibly reordered) order.
    fn points(&self) -> &PointSet<N>;

    /// Whether construction physically reordered the point set.
    ///
    /// When this returns `false`, internal positions equal the caller's
    /// original positions and result remapping can be skipped outright.
    fn rearranges_dataset(&self) -> bool;

    /// The permutation record mapping internal positions back to the
    /// caller's original positions. A bijection on `[0, len)`; the identity
    /// when [`rearranges_dataset`][Self::rearranges_dataset] is `false`.
    fn old_from_new(&self) -> &[usize];

    /// The root node of this index.
    fn root(&self) -> Self::Node<'_>;

    /// Single-tree traversal: drive `rule` down this index for one query
    /// point.
    fn traverse_single<R: TraversalRule<N, Self>>(&self, query: usize, rule: &mut R) {
        descend_single::<N, Self, R>(query, self.root(), rule);
    }

    /// Dual-tree traversal: drive `rule` over (query node, reference node)
    /// pairs, starting from the roots of `self` (the query index) and
    /// `reference`.
    fn traverse_dual<'t, R: TraversalRule<N, Self>>(
        &'t self,
        reference: &'t Self,
        rule: &mut R,
    ) {
        let mut stack = vec![(self.root(), reference.root())];
        while let Some((query_node, ref_node)) = stack.pop() {
            if !rule.descend_pair(&query_node, &ref_node) {
                continue;
            }
            match (query_node.is_leaf(), ref_node.is_leaf()) {
                (true, true) => {
                    for i in query_node.points() {
                        for j in ref_node.points() {
                            rule.base_case(i, j);
                        }
                    }
                }
                (true, false) => {
                    if let Some((left, right)) = ref_node.children() {
                        stack.push((query_node.clone(), left));
                        stack.push((query_node, right));
                    }
                }
                (false, true) => {
                    if let Some((left, right)) = query_node.children() {
                        stack.push((left, ref_node.clone()));
                        stack.push((right, ref_node));
                    }
                }
                (false, false) => {
                    if let (Some((q_left, q_right)), Some((r_left, r_right))) =
                        (query_node.children(), ref_node.children())
                    {
                        stack.push((q_left.clone(), r_left.clone()));
                        stack.push((q_left, r_right.clone()));
                        stack.push((q_right.clone(), r_left));
                        stack.push((q_right, r_right));
                    }
                }
            }
        }
    }
}

fn descend_single<'t, N, T, R>(query: usize, node: T::Node<'t>, rule: &mut R)
where
    N: CoordNum,
    T: SpatialIndex<N> + 't,
    R: TraversalRule<N, T>,
{
    if !rule.descend_point(query, &node) {
        return;
    }
    if node.is_leaf() {
        for reference in node.points() {
            rule.base_case(query, reference);
        }
    } else if let Some((left, right)) = node.children() {
        descend_single::<N, T, R>(query, left, rule);
        descend_single::<N, T, R>(query, right, rule);
    }
}
