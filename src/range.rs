use crate::r#type::CoordNum;

/// A closed distance interval `[lo, hi]`, inclusive at both ends.
///
/// An inverted interval (`lo > hi`) is valid configuration: it contains no
/// distance, so every query simply produces an empty result row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRange<N: CoordNum> {
    lo: N,
    hi: N,
}

impl<N: CoordNum> DistanceRange<N> {
    /// Create a new closed interval `[lo, hi]`.
    pub fn new(lo: N, hi: N) -> Self {
        Self { lo, hi }
    }

    /// The lower bound of the interval.
    #[inline]
    pub fn lo(&self) -> N {
        self.lo
    }

    /// The upper bound of the interval.
    #[inline]
    pub fn hi(&self) -> N {
        self.hi
    }

    /// Returns `true` if `distance` lies within the interval.
    #[inline]
    pub fn contains(&self, distance: N) -> bool {
        distance >= self.lo && distance <= self.hi
    }

    /// Returns `true` if the interval contains no distance at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }
}
