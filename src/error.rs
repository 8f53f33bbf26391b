//! Error types for merkle-core.
//!
//! A single, flat enum covers every failure mode named in the core's error
//! taxonomy: bad arguments, an empty leaf set, a malformed wire format, I/O
//! failure while spilling to scratch storage, cooperative cancellation, and
//! attempts to use a cache/tree in a state that doesn't support the
//! requested operation.

use thiserror::Error;

/// Canonical error type returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum MerkleError {
    /// Caller-supplied argument is out of range or otherwise invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A streaming build or in-memory construction was given zero leaves.
    #[error("no leaves were produced")]
    EmptyInput,

    /// A proof or cache payload failed magic/version/CRC/structural checks.
    #[error("format mismatch: {0}")]
    FormatMismatch(String),

    /// Scratch-file or cache-file I/O failed.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Cooperative cancellation was observed at a suspension point.
    #[error("operation was cancelled")]
    Cancelled,

    /// The tree/cache is not in a state that supports the requested operation
    /// (e.g. saving a cache that was never built, or reading cache metadata
    /// from a tree built without one).
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
}

/// Convenience alias used throughout the crate.
pub type MerkleResult<T> = Result<T, MerkleError>;
