use std::fmt::Debug;

use num_traits::{Bounded, Float};

/// A trait for scalar types usable as point coordinates and distances.
///
/// This trait is sealed and cannot be implemented for external types. Pruning
/// relies on `max_value()`/`min_value()` sentinels for the bounds of empty
/// nodes, so only the two IEEE float types are supported.
pub trait CoordNum: private::Sealed + Float + Bounded + Debug + Send + Sync + 'static {}

impl CoordNum for f32 {}
impl CoordNum for f64 {}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
