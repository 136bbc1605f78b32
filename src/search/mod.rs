//! The range-search orchestrator.
//!
//! [`RangeSearch`] owns (or borrows) a reference index, dispatches each
//! query batch to the configured strategy, and translates the internal
//! point positions trees impose back into the caller's original positions
//! before returning anything.

use std::fmt;

use crate::error::{RangeIndexError, Result};
use crate::index::SpatialIndex;
use crate::kdtree::KdTree;
use crate::metric::Metric;
use crate::points::PointSet;
use crate::r#type::CoordNum;
use crate::range::DistanceRange;
use crate::search::rules::{DualRule, QueryRowRule, RuleContext};

mod rules;

#[cfg(test)]
mod test;

/// The execution strategy of a [`RangeSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Brute force over every (query, reference) pair; no index is built.
    Naive,
    /// An index over the reference set only, traversed once per query point.
    SingleTree,
    /// Indices over both sets, traversed jointly for shared pruning.
    DualTree,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchMode::Naive => "naive",
            SearchMode::SingleTree => "single-tree",
            SearchMode::DualTree => "dual-tree",
        };
        f.write_str(name)
    }
}

/// A reference index that is either owned by the orchestrator or borrowed
/// from the caller. Only owned indices have their permutation undone in
/// results; a caller lending a tree is assumed to manage its own mapping.
enum TreeHandle<'a, T> {
    Owned(T),
    Borrowed(&'a T),
}

impl<T> TreeHandle<'_, T> {
    fn get(&self) -> &T {
        match self {
            TreeHandle::Owned(tree) => tree,
            TreeHandle::Borrowed(tree) => tree,
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self, TreeHandle::Owned(_))
    }
}

/// The strategy plus exactly the reference state it needs. Naive mode holds
/// the caller's point set untouched; the tree modes hold an index.
enum Plan<'a, N: CoordNum, T> {
    Naive(PointSet<N>),
    Single(TreeHandle<'a, T>),
    Dual(TreeHandle<'a, T>),
}

/// Per-query range-search results, indexed by the caller's original point
/// positions.
///
/// For each query point: the reference points found in range and, at the
/// matching offsets, their distances. Entries within a row are unordered
/// and duplicate-free.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults<N: CoordNum> {
    neighbors: Vec<Vec<usize>>,
    distances: Vec<Vec<N>>,
}

impl<N: CoordNum> SearchResults<N> {
    /// The number of query points these results cover.
    pub fn num_queries(&self) -> usize {
        self.neighbors.len()
    }

    /// The reference-point indices in range of query `query`.
    pub fn neighbors(&self, query: usize) -> &[usize] {
        &self.neighbors[query]
    }

    /// The distances matching [`neighbors`][Self::neighbors] for `query`.
    pub fn distances(&self, query: usize) -> &[N] {
        &self.distances[query]
    }

    /// Iterate over the (reference index, distance) pairs for `query`.
    pub fn pairs(&self, query: usize) -> impl Iterator<Item = (usize, N)> + '_ {
        self.neighbors[query]
            .iter()
            .copied()
            .zip(self.distances[query].iter().copied())
    }

    /// Consume the results, returning the raw neighbor and distance rows.
    pub fn into_inner(self) -> (Vec<Vec<usize>>, Vec<Vec<N>>) {
        (self.neighbors, self.distances)
    }
}

/// Range search over a reference point set.
///
/// Generic over the scalar type, the [`Metric`], and the [`SpatialIndex`]
/// implementation (the bundled [`KdTree`] by default). All strategies
/// return identical results; they differ only in how much work they avoid.
pub struct RangeSearch<'a, N: CoordNum, M: Metric<N>, T: SpatialIndex<N> = KdTree<N>> {
    plan: Plan<'a, N, T>,
    metric: M,
}

impl<N: CoordNum, M: Metric<N>, T: SpatialIndex<N>> RangeSearch<'_, N, M, T> {
    /// Create a searcher over `references`, building an owned index unless
    /// `mode` is [`SearchMode::Naive`].
    pub fn new(references: PointSet<N>, mode: SearchMode, metric: M) -> Self {
        let plan = match mode {
            SearchMode::Naive => Plan::Naive(references),
            SearchMode::SingleTree => {
                Plan::Single(TreeHandle::Owned(T::from_point_set(references)))
            }
            SearchMode::DualTree => Plan::Dual(TreeHandle::Owned(T::from_point_set(references))),
        };
        Self { plan, metric }
    }

    /// The configured execution strategy.
    pub fn mode(&self) -> SearchMode {
        match &self.plan {
            Plan::Naive(_) => SearchMode::Naive,
            Plan::Single(_) => SearchMode::SingleTree,
            Plan::Dual(_) => SearchMode::DualTree,
        }
    }

    /// Returns `true` if this searcher built and owns its reference index.
    pub fn owns_tree(&self) -> bool {
        match &self.plan {
            Plan::Naive(_) => false,
            Plan::Single(handle) | Plan::Dual(handle) => handle.is_owned(),
        }
    }

    /// The configured metric.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// The reference set, in the internal order of the index if one exists.
    pub fn reference_points(&self) -> &PointSet<N> {
        match &self.plan {
            Plan::Naive(points) => points,
            Plan::Single(handle) | Plan::Dual(handle) => handle.get().points(),
        }
    }

    /// Find all reference points within `range` of each point in `queries`.
    ///
    /// In dual-tree mode a strategy-local index is built over `queries` and
    /// dropped before returning; its reordering never leaks into the
    /// returned row order.
    pub fn search(&self, queries: &PointSet<N>, range: DistanceRange<N>) -> Result<SearchResults<N>> {
        self.check_dims(queries)?;
        let results = match &self.plan {
            Plan::Naive(points) => {
                let ctx = RuleContext::new(points, queries, range, &self.metric, false);
                let (neighbors, distances) = naive_rows(&ctx);
                remap(neighbors, distances, None, None)
            }
            Plan::Single(handle) => {
                let tree = handle.get();
                let ctx = RuleContext::new(tree.points(), queries, range, &self.metric, false);
                let (neighbors, distances) = single_tree_rows(tree, &ctx);
                remap(neighbors, distances, None, self.reference_map())
            }
            Plan::Dual(handle) => {
                let tree = handle.get();
                let query_tree = T::from_point_set(queries.clone());
                let ctx = RuleContext::new(
                    tree.points(),
                    query_tree.points(),
                    range,
                    &self.metric,
                    false,
                );
                let (neighbors, distances) = dual_tree_rows(&query_tree, tree, &ctx);
                let query_map = query_tree
                    .rearranges_dataset()
                    .then(|| query_tree.old_from_new());
                remap(neighbors, distances, query_map, self.reference_map())
            }
        };
        Ok(results)
    }

    /// Find all reference points within `range` of each point of a
    /// pre-built query index.
    ///
    /// Result rows are indexed by the query tree's own point order; undoing
    /// any reordering the caller's tree performed is the caller's business.
    /// Only valid in dual-tree mode; any other configuration is a usage
    /// error, detected before any traversal work.
    pub fn search_with_tree(&self, query_tree: &T, range: DistanceRange<N>) -> Result<SearchResults<N>> {
        let Plan::Dual(handle) = &self.plan else {
            return Err(RangeIndexError::QueryTreeRequiresDualMode);
        };
        self.check_dims(query_tree.points())?;

        let tree = handle.get();
        let ctx = RuleContext::new(
            tree.points(),
            query_tree.points(),
            range,
            &self.metric,
            false,
        );
        let (neighbors, distances) = dual_tree_rows(query_tree, tree, &ctx);
        Ok(remap(neighbors, distances, None, self.reference_map()))
    }

    /// Find, for every reference point, all *other* reference points within
    /// `range` of it. A point never appears in its own result row, even
    /// when zero lies inside `range`.
    pub fn search_self(&self, range: DistanceRange<N>) -> SearchResults<N> {
        match &self.plan {
            Plan::Naive(points) => {
                let ctx = RuleContext::new(points, points, range, &self.metric, true);
                let (neighbors, distances) = naive_rows(&ctx);
                remap(neighbors, distances, None, None)
            }
            Plan::Single(handle) => {
                let tree = handle.get();
                let ctx =
                    RuleContext::new(tree.points(), tree.points(), range, &self.metric, true);
                let (neighbors, distances) = single_tree_rows(tree, &ctx);
                remap(neighbors, distances, self.reference_map(), self.reference_map())
            }
            Plan::Dual(handle) => {
                let tree = handle.get();
                let ctx =
                    RuleContext::new(tree.points(), tree.points(), range, &self.metric, true);
                let (neighbors, distances) = dual_tree_rows(tree, tree, &ctx);
                remap(neighbors, distances, self.reference_map(), self.reference_map())
            }
        }
    }

    /// The permutation to undo on the reference side, if any: only an
    /// index this searcher built itself, and only if it reorders points.
    fn reference_map(&self) -> Option<&[usize]> {
        match &self.plan {
            Plan::Naive(_) => None,
            Plan::Single(handle) | Plan::Dual(handle) => {
                let tree = handle.get();
                (handle.is_owned() && tree.rearranges_dataset()).then(|| tree.old_from_new())
            }
        }
    }

    fn check_dims(&self, queries: &PointSet<N>) -> Result<()> {
        let reference = self.reference_points().dim();
        if queries.dim() != reference {
            return Err(RangeIndexError::DimensionMismatch {
                reference,
                query: queries.dim(),
            });
        }
        Ok(())
    }
}

impl<'a, N: CoordNum, M: Metric<N>, T: SpatialIndex<N>> RangeSearch<'a, N, M, T> {
    /// Create a searcher around a caller-owned, already-built reference
    /// index. The index is never dropped by this searcher and its internal
    /// reordering is never undone in results. Naive mode is not available
    /// here; `single_mode` selects between single- and dual-tree traversal.
    pub fn with_tree(tree: &'a T, single_mode: bool, metric: M) -> Self {
        let handle = TreeHandle::Borrowed(tree);
        let plan = if single_mode {
            Plan::Single(handle)
        } else {
            Plan::Dual(handle)
        };
        Self { plan, metric }
    }
}

impl<N: CoordNum, M: Metric<N>, T: SpatialIndex<N>> fmt::Display for RangeSearch<'_, N, M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = match &self.plan {
            Plan::Naive(_) => "none",
            Plan::Single(handle) | Plan::Dual(handle) => {
                if handle.is_owned() {
                    "owned"
                } else {
                    "borrowed"
                }
            }
        };
        write!(
            f,
            "RangeSearch(mode: {}, tree: {}, metric: {})",
            self.mode(),
            tree,
            self.metric.name()
        )
    }
}

/// Brute force: every (query, reference) pair is a base case.
fn naive_rows<N: CoordNum, M: Metric<N>>(
    ctx: &RuleContext<'_, N, M>,
) -> (Vec<Vec<usize>>, Vec<Vec<N>>) {
    let mut neighbors = vec![Vec::new(); ctx.num_queries()];
    let mut distances = vec![Vec::new(); ctx.num_queries()];
    for (query, (neighbor_row, distance_row)) in
        neighbors.iter_mut().zip(&mut distances).enumerate()
    {
        naive_row(ctx, query, neighbor_row, distance_row);
    }
    (neighbors, distances)
}

fn naive_row<N: CoordNum, M: Metric<N>>(
    ctx: &RuleContext<'_, N, M>,
    query: usize,
    neighbors: &mut Vec<usize>,
    distances: &mut Vec<N>,
) {
    for reference in 0..ctx.num_references() {
        if let Some((index, distance)) = ctx.evaluate(query, reference) {
            neighbors.push(index);
            distances.push(distance);
        }
    }
}

/// One traversal of the reference index per query point.
fn single_tree_rows<N: CoordNum, M: Metric<N>, T: SpatialIndex<N>>(
    tree: &T,
    ctx: &RuleContext<'_, N, M>,
) -> (Vec<Vec<usize>>, Vec<Vec<N>>) {
    let mut neighbors = vec![Vec::new(); ctx.num_queries()];
    let mut distances = vec![Vec::new(); ctx.num_queries()];
    for (query, (neighbor_row, distance_row)) in
        neighbors.iter_mut().zip(&mut distances).enumerate()
    {
        let mut rule = QueryRowRule {
            ctx,
            query,
            neighbors: neighbor_row,
            distances: distance_row,
        };
        tree.traverse_single(query, &mut rule);
    }
    (neighbors, distances)
}

/// One joint traversal of both indices.
fn dual_tree_rows<N: CoordNum, M: Metric<N>, T: SpatialIndex<N>>(
    query_tree: &T,
    reference_tree: &T,
    ctx: &RuleContext<'_, N, M>,
) -> (Vec<Vec<usize>>, Vec<Vec<N>>) {
    let mut neighbors = vec![Vec::new(); ctx.num_queries()];
    let mut distances = vec![Vec::new(); ctx.num_queries()];
    let mut rule = DualRule {
        ctx,
        neighbors: &mut neighbors,
        distances: &mut distances,
    };
    query_tree.traverse_dual(reference_tree, &mut rule);
    (neighbors, distances)
}

/// The single remapping pass from internal to caller-facing positions.
///
/// `query_map` permutes whole rows (set when a query index was built
/// internally for this call and reordered its points); `reference_map`
/// rewrites the neighbor indices inside each row (set when the reference
/// index is owned and reorders). Either may be absent independently.
fn remap<N: CoordNum>(
    neighbors: Vec<Vec<usize>>,
    distances: Vec<Vec<N>>,
    query_map: Option<&[usize]>,
    reference_map: Option<&[usize]>,
) -> SearchResults<N> {
    if query_map.is_none() && reference_map.is_none() {
        return SearchResults {
            neighbors,
            distances,
        };
    }

    let num_queries = neighbors.len();
    let mut out_neighbors = vec![Vec::new(); num_queries];
    let mut out_distances = vec![Vec::new(); num_queries];
    for (internal, (neighbor_row, distance_row)) in
        neighbors.into_iter().zip(distances).enumerate()
    {
        let query = query_map.map_or(internal, |map| map[internal]);
        out_neighbors[query] = match reference_map {
            Some(map) => neighbor_row.into_iter().map(|index| map[index]).collect(),
            None => neighbor_row,
        };
        out_distances[query] = distance_row;
    }
    SearchResults {
        neighbors: out_neighbors,
        distances: out_distances,
    }
}

#[cfg(feature = "rayon")]
mod parallel {
    use rayon::prelude::*;

    use super::*;

    impl<N: CoordNum, M: Metric<N>, T: SpatialIndex<N> + Sync> RangeSearch<'_, N, M, T> {
        /// Like [`search`][Self::search], parallelized across query points
        /// for the naive and single-tree strategies. Dual-tree search runs
        /// sequentially. Results are identical to the sequential call.
        pub fn par_search(
            &self,
            queries: &PointSet<N>,
            range: DistanceRange<N>,
        ) -> Result<SearchResults<N>> {
            self.check_dims(queries)?;
            match &self.plan {
                Plan::Naive(points) => {
                    let ctx = RuleContext::new(points, queries, range, &self.metric, false);
                    let (neighbors, distances) = par_naive_rows(&ctx);
                    Ok(remap(neighbors, distances, None, None))
                }
                Plan::Single(handle) => {
                    let tree = handle.get();
                    let ctx =
                        RuleContext::new(tree.points(), queries, range, &self.metric, false);
                    let (neighbors, distances) = par_single_tree_rows(tree, &ctx);
                    Ok(remap(neighbors, distances, None, self.reference_map()))
                }
                Plan::Dual(_) => self.search(queries, range),
            }
        }

        /// Like [`search_self`][Self::search_self], parallelized across
        /// query points for the naive and single-tree strategies.
        pub fn par_search_self(&self, range: DistanceRange<N>) -> SearchResults<N> {
            match &self.plan {
                Plan::Naive(points) => {
                    let ctx = RuleContext::new(points, points, range, &self.metric, true);
                    let (neighbors, distances) = par_naive_rows(&ctx);
                    remap(neighbors, distances, None, None)
                }
                Plan::Single(handle) => {
                    let tree = handle.get();
                    let ctx =
                        RuleContext::new(tree.points(), tree.points(), range, &self.metric, true);
                    let (neighbors, distances) = par_single_tree_rows(tree, &ctx);
                    remap(neighbors, distances, self.reference_map(), self.reference_map())
                }
                Plan::Dual(_) => self.search_self(range),
            }
        }
    }

    fn par_naive_rows<N: CoordNum, M: Metric<N>>(
        ctx: &RuleContext<'_, N, M>,
    ) -> (Vec<Vec<usize>>, Vec<Vec<N>>) {
        (0..ctx.num_queries())
            .into_par_iter()
            .map(|query| {
                let mut neighbors = Vec::new();
                let mut distances = Vec::new();
                naive_row(ctx, query, &mut neighbors, &mut distances);
                (neighbors, distances)
            })
            .unzip()
    }

    fn par_single_tree_rows<N: CoordNum, M: Metric<N>, T: SpatialIndex<N> + Sync>(
        tree: &T,
        ctx: &RuleContext<'_, N, M>,
    ) -> (Vec<Vec<usize>>, Vec<Vec<N>>) {
        (0..ctx.num_queries())
            .into_par_iter()
            .map(|query| {
                let mut neighbors = Vec::new();
                let mut distances = Vec::new();
                let mut rule = QueryRowRule {
                    ctx,
                    query,
                    neighbors: &mut neighbors,
                    distances: &mut distances,
                };
                tree.traverse_single(query, &mut rule);
                (neighbors, distances)
            })
            .unzip()
    }
}
