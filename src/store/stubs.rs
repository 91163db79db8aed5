//! In-memory stub implementations of the collaborator traits
//!
//! These implementations are intended for:
//! - **Unit testing** without external services
//! - **Integration testing** of the full find/fetch flow
//! - **Development and prototyping**
//!
//! # Warning
//!
//! **Not suitable for production use.** [`MemoryStore`] holds every sample in
//! memory with no persistence, and [`MemoryCache`] is process-local and
//! unbounded apart from TTL expiry.
//!
//! [`MemoryStore`] carries per-method call counters and a failure switch so
//! tests can assert cache behavior (a cached second call must not reach the
//! store) and exercise degraded paths.

use crate::error::{CacheError, StoreError};
use crate::store::traits::{MetricCache, SeriesSearch, TimeSeriesStore};
use crate::types::RawPoint;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory time-series store stub
#[derive(Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<String, Vec<RawPoint>>>,
    /// Calls to `list_series` since construction
    pub list_calls: AtomicUsize,
    /// Calls to `query_range` since construction
    pub range_calls: AtomicUsize,
    /// Calls to `query_bound` since construction
    pub bound_calls: AtomicUsize,
    /// When set, every call fails with a query error
    pub fail: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series with its raw samples (sorted ascending by caller)
    pub fn insert_series(&self, name: impl Into<String>, points: Vec<RawPoint>) {
        self.series.write().insert(name.into(), points);
    }

    /// Register a series name with no samples
    pub fn insert_name(&self, name: impl Into<String>) {
        self.series.write().entry(name.into()).or_default();
    }

    /// Flip the failure switch
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check_fail(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::QueryFailed("stub failure injected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn list_series(&self, prefix_regex: &str) -> Result<Vec<String>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail()?;
        let re = Regex::new(prefix_regex)
            .map_err(|e| StoreError::QueryFailed(format!("bad filter regex: {}", e)))?;
        let mut names: Vec<String> = self
            .series
            .read()
            .keys()
            .filter(|n| re.is_match(n))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn query_range(
        &self,
        series: &[String],
        start: i64,
        end: i64,
    ) -> Result<HashMap<String, Vec<RawPoint>>, StoreError> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail()?;
        let data = self.series.read();
        let mut out = HashMap::new();
        for name in series {
            if let Some(points) = data.get(name) {
                let window: Vec<RawPoint> = points
                    .iter()
                    .filter(|p| p.timestamp >= start && p.timestamp <= end)
                    .copied()
                    .collect();
                // Mimic distributed stores: series with zero matching samples
                // are omitted from the result map entirely.
                if !window.is_empty() {
                    out.insert(name.clone(), window);
                }
            }
        }
        Ok(out)
    }

    async fn query_bound(
        &self,
        series: &str,
        ascending: bool,
    ) -> Result<Option<i64>, StoreError> {
        self.bound_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail()?;
        let data = self.series.read();
        let points = match data.get(series) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(None),
        };
        let ts = if ascending {
            points.iter().map(|p| p.timestamp).min()
        } else {
            points.iter().map(|p| p.timestamp).max()
        };
        Ok(ts)
    }
}

#[async_trait]
impl SeriesSearch for MemoryStore {
    async fn search_prefix(&self, prefix_regex: &str) -> Result<Vec<String>, StoreError> {
        self.list_series(prefix_regex).await
    }
}

/// Cached bytes with expiry, millisecond resolution
struct CacheSlot {
    value: Vec<u8>,
    expires_at_ms: i64,
}

/// In-memory TTL cache stub
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheSlot>>,
    /// When set, every call fails as unavailable
    pub fail: AtomicBool,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the failure switch
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Current entry count, expired entries included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl MetricCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("stub failure injected".into()));
        }
        let entries = self.entries.read();
        Ok(entries.get(key).and_then(|slot| {
            if Utc::now().timestamp_millis() > slot.expires_at_ms {
                None
            } else {
                Some(slot.value.clone())
            }
        }))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("stub failure injected".into()));
        }
        let expires_at_ms = Utc::now().timestamp_millis() + ttl.as_millis() as i64;
        self.entries.write().insert(
            key.to_string(),
            CacheSlot {
                value,
                expires_at_ms,
            },
        );
        Ok(())
    }
}
