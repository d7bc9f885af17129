//! Error taxonomy for the spatial grid.
//!
//! No error here is retried internally, and none is logged by the
//! crate itself — callers decide what to do with a `Result`.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpatialGridError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialGridError {
    /// Invalid construction arguments. Only ever surfaced from `SpatialHash::new`.
    #[error("invalid spatial grid configuration: {reason}")]
    ConfigError { reason: String },

    /// An id passed to `remove`/`move_item` is not present in the grid.
    #[error("unknown item id {id}")]
    UnknownId { id: u32 },

    /// Debug-only assertion: a remove failed to find the expected bucket
    /// entry. Indicates a programming error in the caller (double-remove,
    /// stale id after `clear`), not a grid-internal inconsistency.
    #[error("spatial grid invariant violated: {detail}")]
    InvariantViolation { detail: String },

    /// Shared-write `try_add` could not reserve space in a reverse table.
    /// The caller must finish the current tick, grow capacity via
    /// `prepare_free_place`, and retry.
    #[error("spatial grid capacity exhausted: requested {requested}, available {available}")]
    CapacityExhausted { requested: usize, available: usize },
}
