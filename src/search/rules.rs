//! Pruning and base-case logic shared by all three search strategies.

use crate::bounds::Aabb;
use crate::index::{IndexNode, SpatialIndex, TraversalRule};
use crate::metric::Metric;
use crate::points::PointSet;
use crate::r#type::CoordNum;
use crate::range::DistanceRange;

/// Everything a range-search decision needs: the two point sets (in the
/// internal order of whatever indices are in play), the interval, the
/// metric, and the self-exclusion flag for self-search.
pub(crate) struct RuleContext<'a, N: CoordNum, M: Metric<N>> {
    reference: &'a PointSet<N>,
    queries: &'a PointSet<N>,
    range: DistanceRange<N>,
    metric: &'a M,
    exclude_self: bool,
}

impl<'a, N: CoordNum, M: Metric<N>> RuleContext<'a, N, M> {
    pub(crate) fn new(
        reference: &'a PointSet<N>,
        queries: &'a PointSet<N>,
        range: DistanceRange<N>,
        metric: &'a M,
        exclude_self: bool,
    ) -> Self {
        Self {
            reference,
            queries,
            range,
            metric,
            exclude_self,
        }
    }

    pub(crate) fn num_queries(&self) -> usize {
        self.queries.len()
    }

    pub(crate) fn num_references(&self) -> usize {
        self.reference.len()
    }

    /// The base case: evaluate one (query, reference) pair, returning the
    /// match to record, if any.
    ///
    /// In self-search the query and reference sets are literally the same
    /// set in the same order, so identical positions mean the same point.
    #[inline]
    pub(crate) fn evaluate(&self, query: usize, reference: usize) -> Option<(usize, N)> {
        if self.exclude_self && query == reference {
            return None;
        }
        let distance = self
            .metric
            .distance(self.queries.point(query), self.reference.point(reference));
        if self.range.contains(distance) {
            Some((reference, distance))
        } else {
            None
        }
    }

    /// Returns `true` if no point under `bounds` can be in range of `query`.
    #[inline]
    pub(crate) fn prune_point(&self, query: usize, bounds: &Aabb<N>) -> bool {
        let point = self.queries.point(query);
        self.metric.max_to_bounds(point, bounds) < self.range.lo()
            || self.metric.min_to_bounds(point, bounds) > self.range.hi()
    }

    /// Returns `true` if no pair of points under the two bounds can be in
    /// range of each other.
    #[inline]
    pub(crate) fn prune_pair(&self, query: &Aabb<N>, reference: &Aabb<N>) -> bool {
        self.metric.max_between_bounds(query, reference) < self.range.lo()
            || self.metric.min_between_bounds(query, reference) > self.range.hi()
    }
}

/// A rule that records matches for exactly one query point into one result
/// row. Used by the naive and single-tree strategies, where query rows are
/// independent of each other.
pub(crate) struct QueryRowRule<'a, 'b, N: CoordNum, M: Metric<N>> {
    pub(crate) ctx: &'b RuleContext<'a, N, M>,
    pub(crate) query: usize,
    pub(crate) neighbors: &'b mut Vec<usize>,
    pub(crate) distances: &'b mut Vec<N>,
}

impl<N: CoordNum, M: Metric<N>, T: SpatialIndex<N>> TraversalRule<N, T>
    for QueryRowRule<'_, '_, N, M>
{
    fn base_case(&mut self, query: usize, reference: usize) {
        debug_assert_eq!(query, self.query);
        if let Some((index, distance)) = self.ctx.evaluate(query, reference) {
            self.neighbors.push(index);
            self.distances.push(distance);
        }
    }

    fn descend_point<'t>(&self, query: usize, node: &T::Node<'t>) -> bool
    where
        T: 't,
    {
        !self.ctx.prune_point(query, node.bounds())
    }

    fn descend_pair<'t>(&self, query: &T::Node<'t>, reference: &T::Node<'t>) -> bool
    where
        T: 't,
    {
        !self.ctx.prune_pair(query.bounds(), reference.bounds())
    }
}

/// A rule that records matches for every query point of a dual traversal.
pub(crate) struct DualRule<'a, 'b, N: CoordNum, M: Metric<N>> {
    pub(crate) ctx: &'b RuleContext<'a, N, M>,
    pub(crate) neighbors: &'b mut [Vec<usize>],
    pub(crate) distances: &'b mut [Vec<N>],
}

impl<N: CoordNum, M: Metric<N>, T: SpatialIndex<N>> TraversalRule<N, T>
    for DualRule<'_, '_, N, M>
{
    fn base_case(&mut self, query: usize, reference: usize) {
        if let Some((index, distance)) = self.ctx.evaluate(query, reference) {
            self.neighbors[query].push(index);
            self.distances[query].push(distance);
        }
    }

    fn descend_point<'t>(&self, query: usize, node: &T::Node<'t>) -> bool
    where
        T: 't,
    {
        !self.ctx.prune_point(query, node.bounds())
    }

    fn descend_pair<'t>(&self, query: &T::Node<'t>, reference: &T::Node<'t>) -> bool
    where
        T: 't,
    {
        !self.ctx.prune_pair(query.bounds(), reference.bounds())
    }
}
