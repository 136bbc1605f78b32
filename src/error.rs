use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
pub enum RangeIndexError {
    /// Searching against a pre-built query tree is only valid for an
    /// orchestrator configured for dual-tree search.
    #[error("searching with a pre-built query tree requires dual-tree mode")]
    QueryTreeRequiresDualMode,

    /// The query set and reference set do not have the same dimensionality.
    #[error("dimension mismatch: reference set is {reference}-dimensional, query set is {query}-dimensional")]
    DimensionMismatch {
        /// Dimensionality of the reference set.
        reference: usize,
        /// Dimensionality of the query set.
        query: usize,
    },
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, RangeIndexError>;
