//! Core trait definitions for external collaborators
//!
//! The bridge owns no storage: it sits between a query-serving frontend and a
//! time-series backend. These traits describe exactly what it needs from the
//! outside world. Implementations wrap the real wire clients; the stubs in
//! [`crate::store::stubs`] cover tests and development.

use crate::error::{CacheError, StoreError};
use crate::types::RawPoint;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

// =============================================================================
// TimeSeriesStore Trait
// =============================================================================

/// The backing time-series store
///
/// Owns storage and indexing of raw samples. All calls are failable; the
/// bridge converts failures into its own taxonomy at the call boundary and
/// never leaks transport errors.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync + 'static {
    /// List known series names matching a prefix-anchored regex
    ///
    /// The store may treat the expression as a substring match, which is why
    /// the bridge ships prefix-anchored sources only (see
    /// [`crate::pattern::Anchor::Prefix`]).
    async fn list_series(&self, prefix_regex: &str) -> Result<Vec<String>, StoreError>;

    /// Fetch raw samples for a set of series over a window
    ///
    /// Distributed stores may omit series with zero matching samples from the
    /// result map; callers reconcile against their expected key set.
    async fn query_range(
        &self,
        series: &[String],
        start: i64,
        end: i64,
    ) -> Result<HashMap<String, Vec<RawPoint>>, StoreError>;

    /// Fetch the single earliest (`ascending`) or latest sample timestamp
    ///
    /// Returns `Ok(None)` when the series has no samples at all.
    async fn query_bound(&self, series: &str, ascending: bool)
        -> Result<Option<i64>, StoreError>;
}

// =============================================================================
// SeriesSearch Trait
// =============================================================================

/// Optional secondary search index for accelerated series listing
///
/// When configured, it is consulted before the store; any failure falls back
/// to [`TimeSeriesStore::list_series`].
#[async_trait]
pub trait SeriesSearch: Send + Sync + 'static {
    /// List series names matching a prefix-anchored regex
    async fn search_prefix(&self, prefix_regex: &str) -> Result<Vec<String>, StoreError>;
}

// =============================================================================
// MetricCache Trait
// =============================================================================

/// Shared get/set-with-ttl cache store
///
/// Values are opaque bytes; callers serialize their own types. The cache is
/// borrowed (injected), never owned, and its absence is a valid
/// configuration. Errors are handled as misses, never surfaced to the end
/// caller: an unreachable cache degrades the bridge to always-recompute.
#[async_trait]
pub trait MetricCache: Send + Sync + 'static {
    /// Look up a key, `Ok(None)` on miss
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value with a TTL; overwriting an existing key is not an error
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}
