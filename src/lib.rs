#![doc = include_str!("../README.md")]

mod bounds;
mod error;
pub mod index;
pub mod kdtree;
pub mod linear;
pub mod metric;
mod points;
mod range;
pub mod search;
mod r#type;

pub use bounds::Aabb;
pub use error::{RangeIndexError, Result};
pub use points::PointSet;
pub use range::DistanceRange;
pub use r#type::CoordNum;
pub use search::{RangeSearch, SearchMode, SearchResults};
