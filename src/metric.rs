//! Distance metrics for range queries.
//!
//! A [`Metric`] computes point-to-point distances plus the four bound
//! computations pruning relies on. The bounds do not have to be tight, but
//! they must bracket every achievable point-to-point distance, and they must
//! be monotone-consistent with `distance` (which is why a squared metric is
//! acceptable even though it violates the triangle inequality).

use crate::bounds::Aabb;
use crate::r#type::CoordNum;

/// A distance metric over coordinate vectors.
pub trait Metric<N: CoordNum>: Send + Sync {
    /// The distance between two points.
    fn distance(&self, a: &[N], b: &[N]) -> N;

    /// A lower bound on the distance between `point` and any point in
    /// `bounds`.
    fn min_to_bounds(&self, point: &[N], bounds: &Aabb<N>) -> N;

    /// An upper bound on the distance between `point` and any point in
    /// `bounds`.
    fn max_to_bounds(&self, point: &[N], bounds: &Aabb<N>) -> N;

    /// A lower bound on the distance between any point in `a` and any point
    /// in `b`.
    fn min_between_bounds(&self, a: &Aabb<N>, b: &Aabb<N>) -> N;

    /// An upper bound on the distance between any point in `a` and any point
    /// in `b`.
    fn max_between_bounds(&self, a: &Aabb<N>, b: &Aabb<N>) -> N;

    /// A short human-readable name for diagnostics.
    fn name(&self) -> &'static str;
}

/// 1D distance from a value to a range.
#[inline]
fn axis_dist<N: CoordNum>(k: N, min: N, max: N) -> N {
    if k < min {
        min - k
    } else if k <= max {
        N::zero()
    } else {
        k - max
    }
}

/// 1D distance from a value to the farthest end of a range.
#[inline]
fn axis_span<N: CoordNum>(k: N, min: N, max: N) -> N {
    (k - min).max(max - k)
}

/// 1D distance between two ranges, zero if they overlap.
#[inline]
fn axis_gap<N: CoordNum>(a_min: N, a_max: N, b_min: N, b_max: N) -> N {
    if a_max < b_min {
        b_min - a_max
    } else if b_max < a_min {
        a_min - b_max
    } else {
        N::zero()
    }
}

/// 1D distance between the farthest ends of two ranges.
#[inline]
fn axis_far<N: CoordNum>(a_min: N, a_max: N, b_min: N, b_max: N) -> N {
    (a_max - b_min).max(b_max - a_min)
}

/// Standard straight-line distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl<N: CoordNum> Metric<N> for Euclidean {
    #[inline]
    fn distance(&self, a: &[N], b: &[N]) -> N {
        SquaredEuclidean.distance(a, b).sqrt()
    }

    fn min_to_bounds(&self, point: &[N], bounds: &Aabb<N>) -> N {
        SquaredEuclidean.min_to_bounds(point, bounds).sqrt()
    }

    fn max_to_bounds(&self, point: &[N], bounds: &Aabb<N>) -> N {
        SquaredEuclidean.max_to_bounds(point, bounds).sqrt()
    }

    fn min_between_bounds(&self, a: &Aabb<N>, b: &Aabb<N>) -> N {
        SquaredEuclidean.min_between_bounds(a, b).sqrt()
    }

    fn max_between_bounds(&self, a: &Aabb<N>, b: &Aabb<N>) -> N {
        SquaredEuclidean.max_between_bounds(a, b).sqrt()
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

/// Squared straight-line distance.
///
/// Not a true metric, but monotone in the Euclidean distance, so pruning
/// stays sound. Useful when the caller's range bounds are already squared
/// and the square root per pair would be wasted work.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

impl<N: CoordNum> Metric<N> for SquaredEuclidean {
    #[inline]
    fn distance(&self, a: &[N], b: &[N]) -> N {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .fold(N::zero(), |acc, (&x, &y)| acc + (x - y) * (x - y))
    }

    fn min_to_bounds(&self, point: &[N], bounds: &Aabb<N>) -> N {
        point
            .iter()
            .enumerate()
            .fold(N::zero(), |acc, (d, &c)| {
                let dist = axis_dist(c, bounds.lower()[d], bounds.upper()[d]);
                acc + dist * dist
            })
    }

    fn max_to_bounds(&self, point: &[N], bounds: &Aabb<N>) -> N {
        point
            .iter()
            .enumerate()
            .fold(N::zero(), |acc, (d, &c)| {
                let dist = axis_span(c, bounds.lower()[d], bounds.upper()[d]);
                acc + dist * dist
            })
    }

    fn min_between_bounds(&self, a: &Aabb<N>, b: &Aabb<N>) -> N {
        (0..a.dim()).fold(N::zero(), |acc, d| {
            let dist = axis_gap(a.lower()[d], a.upper()[d], b.lower()[d], b.upper()[d]);
            acc + dist * dist
        })
    }

    fn max_between_bounds(&self, a: &Aabb<N>, b: &Aabb<N>) -> N {
        (0..a.dim()).fold(N::zero(), |acc, d| {
            let dist = axis_far(a.lower()[d], a.upper()[d], b.lower()[d], b.upper()[d]);
            acc + dist * dist
        })
    }

    fn name(&self) -> &'static str {
        "squared-euclidean"
    }
}

/// City-block distance: the sum of per-axis absolute differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl<N: CoordNum> Metric<N> for Manhattan {
    #[inline]
    fn distance(&self, a: &[N], b: &[N]) -> N {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .fold(N::zero(), |acc, (&x, &y)| acc + (x - y).abs())
    }

    fn min_to_bounds(&self, point: &[N], bounds: &Aabb<N>) -> N {
        point.iter().enumerate().fold(N::zero(), |acc, (d, &c)| {
            acc + axis_dist(c, bounds.lower()[d], bounds.upper()[d])
        })
    }

    fn max_to_bounds(&self, point: &[N], bounds: &Aabb<N>) -> N {
        point.iter().enumerate().fold(N::zero(), |acc, (d, &c)| {
            acc + axis_span(c, bounds.lower()[d], bounds.upper()[d])
        })
    }

    fn min_between_bounds(&self, a: &Aabb<N>, b: &Aabb<N>) -> N {
        (0..a.dim()).fold(N::zero(), |acc, d| {
            acc + axis_gap(a.lower()[d], a.upper()[d], b.lower()[d], b.upper()[d])
        })
    }

    fn max_between_bounds(&self, a: &Aabb<N>, b: &Aabb<N>) -> N {
        (0..a.dim()).fold(N::zero(), |acc, d| {
            acc + axis_far(a.lower()[d], a.upper()[d], b.lower()[d], b.upper()[d])
        })
    }

    fn name(&self) -> &'static str {
        "manhattan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::PointSet;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn euclidean_distance() {
        let distance = Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((distance - 5.0f64).abs() < 1e-12);
    }

    #[test]
    fn manhattan_distance() {
        let distance = Manhattan.distance(&[1.0, 1.0], &[3.0, -4.0]);
        assert!((distance - 7.0f64).abs() < 1e-12);
    }

    #[test]
    fn point_to_bounds_distances() {
        let points = PointSet::from_flat(vec![1.0, 1.0, 3.0, 4.0], 2);
        let bounds = Aabb::from_point_range(&points, 0, 2);

        // Inside the box.
        assert_eq!(Euclidean.min_to_bounds(&[2.0, 2.0], &bounds), 0.0);
        // Left of the box.
        assert!((Euclidean.min_to_bounds(&[0.0, 1.0], &bounds) - 1.0f64).abs() < 1e-12);
        // Farthest corner from the origin is (3, 4).
        assert!((Euclidean.max_to_bounds(&[0.0, 0.0], &bounds) - 5.0f64).abs() < 1e-12);
    }

    /// For points sampled inside two boxes, the pairwise distance must lie
    /// between the min and max bound estimates of every metric.
    #[test]
    fn bounds_bracket_distances() {
        let mut rng = StdRng::seed_from_u64(42);
        let metrics: Vec<Box<dyn Metric<f64>>> = vec![
            Box::new(Euclidean),
            Box::new(SquaredEuclidean),
            Box::new(Manhattan),
        ];

        for _ in 0..50 {
            let dim = rng.gen_range(1..=4);
            let sample =
                |rng: &mut StdRng| (0..dim * 8).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let set_a = PointSet::from_flat(sample(&mut rng), dim);
            let set_b = PointSet::from_flat(sample(&mut rng), dim);
            let box_a = Aabb::from_point_range(&set_a, 0, set_a.len());
            let box_b = Aabb::from_point_range(&set_b, 0, set_b.len());

            for metric in &metrics {
                let min = metric.min_between_bounds(&box_a, &box_b);
                let max = metric.max_between_bounds(&box_a, &box_b);
                for a in set_a.iter() {
                    for b in set_b.iter() {
                        let d = metric.distance(a, b);
                        assert!(min <= d + 1e-9 && d <= max + 1e-9);
                        let pmin = metric.min_to_bounds(a, &box_b);
                        let pmax = metric.max_to_bounds(a, &box_b);
                        assert!(pmin <= d + 1e-9 && d <= pmax + 1e-9);
                    }
                }
            }
        }
    }
}
