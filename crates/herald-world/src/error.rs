//! Error types for the `herald-world` crate.
//!
//! Normal propagation never returns these: missing data drops the branch
//! and bumps a counter. They surface from cache construction, provider
//! calls, and explicit path queries.

use herald_types::RegionId;

/// Errors that can occur during region-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A region was not found in the cache.
    #[error("region not found: {0}")]
    RegionNotFound(RegionId),

    /// The provider listed the same region twice.
    #[error("duplicate region in snapshot: {0}")]
    DuplicateRegion(RegionId),

    /// The world data provider failed.
    #[error("world data provider failed: {message}")]
    Provider {
        /// Description of the provider failure.
        message: String,
    },

    /// A path query explored its whole node budget without reaching the goal.
    #[error("path search from {from} to {to} gave up after exploring {explored} regions")]
    SearchBudgetExhausted {
        /// Start region.
        from: RegionId,
        /// Goal region.
        to: RegionId,
        /// Number of regions expanded before giving up.
        explored: usize,
    },
}
