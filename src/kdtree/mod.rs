//! A binary k-d tree that physically reorders its point set.

#![warn(missing_docs)]

mod builder;
mod index;

pub use builder::KdTreeBuilder;
pub use index::{KdNode, KdTree};
