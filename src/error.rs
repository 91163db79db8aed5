//! Error types for the bridge
//!
//! Each subsystem has its own error enum; external-dependency failures are
//! converted into these at the call boundary so raw transport errors never
//! leak to callers.

use thiserror::Error;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Glob pattern error
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Namespace index error
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Backing store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Cache layer error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// General error
    #[error("{0}")]
    General(String),
}

/// Glob pattern errors
///
/// Raised locally, before any store contact. A malformed pattern must be
/// rejected outright, never degraded to a match-all expression.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Pattern translated to an unparsable regular expression
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The original glob pattern
        pattern: String,
        /// Why compilation failed
        reason: String,
    },
}

/// Namespace index errors
#[derive(Error, Debug)]
pub enum IndexError {
    /// Both the search index and the backing store failed to list series
    ///
    /// Distinguishable from a valid empty listing: callers never receive a
    /// silently empty result when the listing could not be resolved.
    #[error("Series listing unavailable for pattern '{pattern}': {reason}")]
    SeriesUnavailable {
        /// The pattern whose listing failed
        pattern: String,
        /// Last failure seen across the lister chain
        reason: String,
    },
}

/// Backing store errors
///
/// Range and bound query failures are surfaced per-series in batched calls so
/// one failing series does not abort the whole batch.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A query against the backing store failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The store did not answer within the configured budget
    #[error("Query timed out after {budget_ms}ms")]
    Timeout {
        /// Timeout budget that elapsed, in milliseconds
        budget_ms: u64,
    },

    /// Connection to the store could not be established
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Cache layer errors
///
/// Never fatal: an unavailable cache is handled as a miss and the system
/// degrades to always-recompute.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache backend is unreachable
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A cached value could not be decoded
    #[error("Cache decode error for key '{key}': {reason}")]
    Decode {
        /// The cache key whose value failed to decode
        key: String,
        /// Decode failure detail
        reason: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
