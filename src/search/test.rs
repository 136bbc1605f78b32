use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::index::SpatialIndex;
use crate::kdtree::{KdTree, KdTreeBuilder};
use crate::linear::LinearIndex;
use crate::metric::{Euclidean, Manhattan, Metric, SquaredEuclidean};
use crate::points::PointSet;
use crate::range::DistanceRange;
use crate::search::{RangeSearch, SearchMode, SearchResults};
use crate::RangeIndexError;

const ALL_MODES: [SearchMode; 3] = [
    SearchMode::Naive,
    SearchMode::SingleTree,
    SearchMode::DualTree,
];

fn random_points(rng: &mut StdRng, len: usize, dim: usize) -> PointSet<f64> {
    let coords = (0..len * dim).map(|_| rng.gen_range(-50.0..50.0)).collect();
    PointSet::from_flat(coords, dim)
}

/// Per-query result rows as sorted (index, distance) pairs, so strategies
/// can be compared without an ordering guarantee.
fn sorted_rows(results: &SearchResults<f64>) -> Vec<Vec<(usize, f64)>> {
    (0..results.num_queries())
        .map(|query| {
            let mut row: Vec<_> = results.pairs(query).collect();
            row.sort_by_key(|&(index, _)| index);
            row
        })
        .collect()
}

fn assert_same_results(a: &SearchResults<f64>, b: &SearchResults<f64>) {
    assert_eq!(a.num_queries(), b.num_queries());
    let rows_a = sorted_rows(a);
    let rows_b = sorted_rows(b);
    for (row_a, row_b) in rows_a.iter().zip(&rows_b) {
        assert_eq!(row_a.len(), row_b.len());
        for (&(index_a, dist_a), &(index_b, dist_b)) in row_a.iter().zip(row_b) {
            assert_eq!(index_a, index_b);
            assert_eq!(dist_a, dist_b, "distances disagree for neighbor {index_a}");
        }
    }
}

fn run<M: Metric<f64>>(
    references: &PointSet<f64>,
    queries: &PointSet<f64>,
    mode: SearchMode,
    range: DistanceRange<f64>,
    metric: M,
) -> SearchResults<f64> {
    let searcher: RangeSearch<f64, M> = RangeSearch::new(references.clone(), mode, metric);
    searcher.search(queries, range).unwrap()
}

#[test]
fn strategies_agree_on_random_inputs() {
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let dim = rng.gen_range(1..=4);
        let num_references = rng.gen_range(1..80);
        let num_queries = rng.gen_range(1..40);
        let references = random_points(&mut rng, num_references, dim);
        let queries = random_points(&mut rng, num_queries, dim);
        let lo = rng.gen_range(0.0..30.0);
        let hi = lo + rng.gen_range(0.0..60.0);
        let range = DistanceRange::new(lo, hi);

        let naive = run(&references, &queries, SearchMode::Naive, range, Euclidean);
        let single = run(&references, &queries, SearchMode::SingleTree, range, Euclidean);
        let dual = run(&references, &queries, SearchMode::DualTree, range, Euclidean);

        assert_same_results(&naive, &single);
        assert_same_results(&naive, &dual);
    }
}

#[test]
fn strategies_agree_for_every_metric() {
    let mut rng = StdRng::seed_from_u64(99);
    let references = random_points(&mut rng, 70, 3);
    let queries = random_points(&mut rng, 30, 3);

    let manhattan_range = DistanceRange::new(5.0, 40.0);
    for mode in [SearchMode::SingleTree, SearchMode::DualTree] {
        let naive = run(&references, &queries, SearchMode::Naive, manhattan_range, Manhattan);
        let tree = run(&references, &queries, mode, manhattan_range, Manhattan);
        assert_same_results(&naive, &tree);

        // Same interval expressed in squared distances.
        let squared_range = DistanceRange::new(25.0, 1600.0);
        let naive = run(
            &references,
            &queries,
            SearchMode::Naive,
            squared_range,
            SquaredEuclidean,
        );
        let tree = run(&references, &queries, mode, squared_range, SquaredEuclidean);
        assert_same_results(&naive, &tree);
    }
}

#[test]
fn concrete_triangle_scenario() {
    let references = PointSet::from_flat(vec![0.0, 0.0, 3.0, 0.0, 0.0, 4.0], 2);
    let queries = PointSet::from_flat(vec![0.0, 0.0], 2);

    for mode in ALL_MODES {
        let wide = run(
            &references,
            &queries,
            mode,
            DistanceRange::new(0.0, 5.0),
            Euclidean,
        );
        let mut pairs: Vec<_> = wide.pairs(0).collect();
        pairs.sort_by_key(|&(index, _)| index);
        assert_eq!(pairs, vec![(0, 0.0), (1, 3.0), (2, 4.0)]);

        let narrow = run(
            &references,
            &queries,
            mode,
            DistanceRange::new(1.0, 3.5),
            Euclidean,
        );
        assert_eq!(narrow.pairs(0).collect::<Vec<_>>(), vec![(1, 3.0)]);
    }
}

#[test]
fn range_boundaries_are_inclusive() {
    let references = PointSet::from_flat(vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0], 2);
    let queries = PointSet::from_flat(vec![0.0, 0.0], 2);
    let eps = 1e-9;

    for mode in ALL_MODES {
        let closed = run(
            &references,
            &queries,
            mode,
            DistanceRange::new(1.0, 3.0),
            Euclidean,
        );
        assert_eq!(closed.neighbors(0).len(), 3);

        let shrunk = run(
            &references,
            &queries,
            mode,
            DistanceRange::new(1.0 + eps, 3.0 - eps),
            Euclidean,
        );
        assert_eq!(shrunk.neighbors(0), &[1]);
    }
}

#[test]
fn inverted_range_yields_empty_rows() {
    let mut rng = StdRng::seed_from_u64(7);
    let references = random_points(&mut rng, 50, 2);
    let queries = random_points(&mut rng, 20, 2);
    let range = DistanceRange::new(10.0, 1.0);

    for mode in ALL_MODES {
        let results = run(&references, &queries, mode, range, Euclidean);
        assert_eq!(results.num_queries(), queries.len());
        for query in 0..results.num_queries() {
            assert!(results.neighbors(query).is_empty());
        }

        let searcher: RangeSearch<f64, Euclidean> =
            RangeSearch::new(references.clone(), mode, Euclidean);
        let self_results = searcher.search_self(range);
        for query in 0..self_results.num_queries() {
            assert!(self_results.neighbors(query).is_empty());
        }
    }
}

#[test]
fn self_search_excludes_the_query_point() {
    let mut rng = StdRng::seed_from_u64(11);
    let references = random_points(&mut rng, 60, 3);
    // Zero is inside the range, so only the exclusion flag keeps a point out
    // of its own row.
    let range = DistanceRange::new(0.0, 1e6);

    let naive_searcher: RangeSearch<f64, Euclidean> =
        RangeSearch::new(references.clone(), SearchMode::Naive, Euclidean);
    let naive = naive_searcher.search_self(range);

    for mode in ALL_MODES {
        let searcher: RangeSearch<f64, Euclidean> =
            RangeSearch::new(references.clone(), mode, Euclidean);
        let results = searcher.search_self(range);
        for query in 0..results.num_queries() {
            assert!(!results.neighbors(query).contains(&query));
            // Everything else is in range.
            assert_eq!(results.neighbors(query).len(), references.len() - 1);
        }
        assert_same_results(&naive, &results);
    }
}

#[test]
fn rearranging_and_non_rearranging_indices_agree() {
    let mut rng = StdRng::seed_from_u64(13);
    let references = random_points(&mut rng, 64, 2);
    let queries = random_points(&mut rng, 32, 2);
    let range = DistanceRange::new(3.0, 25.0);

    for mode in [SearchMode::SingleTree, SearchMode::DualTree] {
        let kd: RangeSearch<f64, Euclidean, KdTree<f64>> =
            RangeSearch::new(references.clone(), mode, Euclidean);
        let linear: RangeSearch<f64, Euclidean, LinearIndex<f64>> =
            RangeSearch::new(references.clone(), mode, Euclidean);

        let kd_results = kd.search(&queries, range).unwrap();
        let linear_results = linear.search(&queries, range).unwrap();
        assert_same_results(&kd_results, &linear_results);

        assert_same_results(&kd.search_self(range), &linear.search_self(range));
    }
}

#[test]
fn query_tree_overload_requires_dual_mode() {
    let mut rng = StdRng::seed_from_u64(17);
    let references = random_points(&mut rng, 30, 2);
    let queries = random_points(&mut rng, 10, 2);
    let query_tree = KdTree::build(queries);
    let range = DistanceRange::new(0.0, 10.0);

    for mode in [SearchMode::Naive, SearchMode::SingleTree] {
        let searcher: RangeSearch<f64, Euclidean> =
            RangeSearch::new(references.clone(), mode, Euclidean);
        let err = searcher.search_with_tree(&query_tree, range).unwrap_err();
        assert!(matches!(err, RangeIndexError::QueryTreeRequiresDualMode));
    }
}

#[test]
fn query_tree_search_matches_plain_dual_search() {
    let mut rng = StdRng::seed_from_u64(19);
    let references = random_points(&mut rng, 55, 3);
    let queries = random_points(&mut rng, 23, 3);
    let range = DistanceRange::new(5.0, 35.0);

    let searcher: RangeSearch<f64, Euclidean> =
        RangeSearch::new(references.clone(), SearchMode::DualTree, Euclidean);
    let plain = searcher.search(&queries, range).unwrap();

    // Rows of the query-tree overload are in the caller's tree order; undo
    // that ordering ourselves to compare.
    let query_tree = KdTree::build(queries.clone());
    let raw = searcher.search_with_tree(&query_tree, range).unwrap();
    let (raw_neighbors, raw_distances) = raw.into_inner();
    let mut neighbors = vec![Vec::new(); queries.len()];
    let mut distances = vec![Vec::new(); queries.len()];
    for (internal, (neighbor_row, distance_row)) in
        raw_neighbors.into_iter().zip(raw_distances).enumerate()
    {
        let original = query_tree.old_from_new()[internal];
        neighbors[original] = neighbor_row;
        distances[original] = distance_row;
    }

    let rows: Vec<Vec<(usize, f64)>> = neighbors
        .iter()
        .zip(&distances)
        .map(|(ns, ds)| {
            let mut row: Vec<_> = ns.iter().copied().zip(ds.iter().copied()).collect();
            row.sort_by_key(|&(index, _)| index);
            row
        })
        .collect();
    assert_eq!(rows, sorted_rows(&plain));
}

#[test]
fn borrowed_tree_indices_are_not_remapped() {
    let mut rng = StdRng::seed_from_u64(23);
    let references = random_points(&mut rng, 48, 2);
    let queries = random_points(&mut rng, 16, 2);
    let range = DistanceRange::new(0.0, 20.0);

    let tree = KdTree::build(references.clone());
    let searcher = RangeSearch::with_tree(&tree, true, Euclidean);
    let borrowed = searcher.search(&queries, range).unwrap();

    // The caller lent the tree, so neighbor indices refer to the tree's
    // internal point order; its permutation record restores identity.
    let naive = run(&references, &queries, SearchMode::Naive, range, Euclidean);
    for query in 0..queries.len() {
        let mut remapped: Vec<usize> = borrowed
            .neighbors(query)
            .iter()
            .map(|&internal| tree.old_from_new()[internal])
            .collect();
        remapped.sort_unstable();
        let mut expected = naive.neighbors(query).to_vec();
        expected.sort_unstable();
        assert_eq!(remapped, expected);
    }
}

#[test]
fn owning_and_borrowing_searchers_are_independent() {
    let mut rng = StdRng::seed_from_u64(29);
    let references = random_points(&mut rng, 40, 2);
    let queries = random_points(&mut rng, 12, 2);
    let range = DistanceRange::new(0.0, 30.0);

    let shared_tree = KdTree::build(references.clone());
    let borrower = RangeSearch::with_tree(&shared_tree, false, Euclidean);
    let owner: RangeSearch<f64, Euclidean> =
        RangeSearch::new(references.clone(), SearchMode::DualTree, Euclidean);

    assert!(owner.owns_tree());
    assert!(!borrower.owns_tree());

    let before = borrower.search(&queries, range).unwrap();
    drop(owner);
    let after = borrower.search(&queries, range).unwrap();
    assert_eq!(before, after);
}

#[test]
fn empty_point_sets() {
    let range = DistanceRange::new(0.0, 10.0);

    for mode in ALL_MODES {
        // No queries.
        let searcher: RangeSearch<f64, Euclidean> = RangeSearch::new(
            PointSet::from_flat(vec![1.0, 1.0], 2),
            mode,
            Euclidean,
        );
        let results = searcher.search(&PointSet::new(2), range).unwrap();
        assert_eq!(results.num_queries(), 0);

        // No references.
        let searcher: RangeSearch<f64, Euclidean> =
            RangeSearch::new(PointSet::new(2), mode, Euclidean);
        let queries = PointSet::from_flat(vec![0.0, 0.0, 5.0, 5.0], 2);
        let results = searcher.search(&queries, range).unwrap();
        assert_eq!(results.num_queries(), 2);
        assert!(results.neighbors(0).is_empty());
        assert!(results.neighbors(1).is_empty());
    }
}

#[test]
fn rows_are_duplicate_free() {
    let mut rng = StdRng::seed_from_u64(31);
    let references = random_points(&mut rng, 90, 2);
    let queries = random_points(&mut rng, 45, 2);
    let range = DistanceRange::new(0.0, 80.0);

    let searcher: RangeSearch<f64, Euclidean> =
        RangeSearch::new(references.clone(), SearchMode::DualTree, Euclidean);

    let results = searcher.search(&queries, range).unwrap();
    for query in 0..results.num_queries() {
        let mut seen = results.neighbors(query).to_vec();
        seen.sort_unstable();
        let len = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), len, "duplicate neighbor for query {query}");
    }

    let self_results = searcher.search_self(range);
    for query in 0..self_results.num_queries() {
        let mut seen = self_results.neighbors(query).to_vec();
        seen.sort_unstable();
        let len = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), len);
    }
}

#[test]
fn small_leaves_still_agree() {
    let mut rng = StdRng::seed_from_u64(37);
    let references = random_points(&mut rng, 120, 2);
    let queries = random_points(&mut rng, 40, 2);
    let range = DistanceRange::new(2.0, 15.0);

    let tree = KdTreeBuilder::from_point_set(references.clone())
        .with_node_size(1)
        .finish();
    let searcher = RangeSearch::with_tree(&tree, false, Euclidean);
    let dual = searcher.search(&queries, range).unwrap();

    let naive = run(&references, &queries, SearchMode::Naive, range, Euclidean);
    for query in 0..queries.len() {
        let mut remapped: Vec<usize> = dual
            .neighbors(query)
            .iter()
            .map(|&internal| tree.old_from_new()[internal])
            .collect();
        remapped.sort_unstable();
        let mut expected = naive.neighbors(query).to_vec();
        expected.sort_unstable();
        assert_eq!(remapped, expected);
    }
}

#[test]
fn dimension_mismatch_is_reported() {
    let searcher: RangeSearch<f64, Euclidean> = RangeSearch::new(
        PointSet::from_flat(vec![0.0, 0.0, 1.0, 1.0], 2),
        SearchMode::SingleTree,
        Euclidean,
    );
    let queries = PointSet::from_flat(vec![0.0, 0.0, 0.0], 3);
    let err = searcher
        .search(&queries, DistanceRange::new(0.0, 1.0))
        .unwrap_err();
    assert!(matches!(
        err,
        RangeIndexError::DimensionMismatch {
            reference: 2,
            query: 3
        }
    ));
}

#[test]
fn display_summarizes_configuration() {
    let searcher: RangeSearch<f64, Euclidean> = RangeSearch::new(
        PointSet::from_flat(vec![0.0, 0.0], 2),
        SearchMode::DualTree,
        Euclidean,
    );
    assert_eq!(
        searcher.to_string(),
        "RangeSearch(mode: dual-tree, tree: owned, metric: euclidean)"
    );

    let naive: RangeSearch<f64, Manhattan> = RangeSearch::new(
        PointSet::from_flat(vec![0.0, 0.0], 2),
        SearchMode::Naive,
        Manhattan,
    );
    assert_eq!(
        naive.to_string(),
        "RangeSearch(mode: naive, tree: none, metric: manhattan)"
    );
}

#[cfg(feature = "rayon")]
mod parallel {
    use super::*;

    #[test]
    fn parallel_search_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(41);
        let references = random_points(&mut rng, 100, 3);
        let queries = random_points(&mut rng, 50, 3);
        let range = DistanceRange::new(1.0, 30.0);

        for mode in ALL_MODES {
            let searcher: RangeSearch<f64, Euclidean> =
                RangeSearch::new(references.clone(), mode, Euclidean);
            let sequential = searcher.search(&queries, range).unwrap();
            let parallel = searcher.par_search(&queries, range).unwrap();
            assert_same_results(&sequential, &parallel);

            assert_same_results(&searcher.search_self(range), &searcher.par_search_self(range));
        }
    }
}
