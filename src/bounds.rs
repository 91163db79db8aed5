//! Data-availability bounds per series
//!
//! Answers "what is the first/last known timestamp for series X". The two
//! bounds have very different churn: the first timestamp of a series changes
//! rarely (long TTL, proportional to the step), while the last one moves with
//! every write (TTL of a single step). Each bound is therefore resolved and
//! cached independently.
//!
//! A failed bound query yields 0 and is never cached, so the next request
//! retries against the store. Fast mode skips the store entirely and reports
//! a synthetic wide-open interval; it is an explicit configuration switch,
//! never a silent fallback.

use crate::error::Error;
use crate::metrics;
use crate::schema::SchemaResolver;
use crate::store::traits::{MetricCache, TimeSeriesStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tunables for bound resolution
#[derive(Debug, Clone)]
pub struct BoundsOptions {
    /// Report `(1, now)` without consulting the store
    pub fast_mode: bool,
    /// First-bound TTL as a multiple of the series step
    pub first_ttl_factor: u64,
    /// Budget for any single store call
    pub query_timeout: Duration,
}

impl Default for BoundsOptions {
    fn default() -> Self {
        Self {
            fast_mode: false,
            first_ttl_factor: 60,
            query_timeout: Duration::from_secs(5),
        }
    }
}

/// Per-series first/last timestamp resolver
pub struct IntervalTracker {
    store: Arc<dyn TimeSeriesStore>,
    cache: Option<Arc<dyn MetricCache>>,
    schema: Arc<SchemaResolver>,
    options: BoundsOptions,
}

impl IntervalTracker {
    /// Create a tracker
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        cache: Option<Arc<dyn MetricCache>>,
        schema: Arc<SchemaResolver>,
        options: BoundsOptions,
    ) -> Self {
        Self {
            store,
            cache,
            schema,
            options,
        }
    }

    /// First and last known timestamps for a series
    ///
    /// Store failures degrade to a zero bound with a warning; they are not
    /// surfaced as errors and never cached.
    pub async fn bounds(&self, series: &str) -> Result<(i64, i64), Error> {
        if self.options.fast_mode {
            return Ok((1, Utc::now().timestamp()));
        }

        let step = self.schema.resolve(series);
        let first_ttl = Duration::from_secs(step as u64 * self.options.first_ttl_factor);
        let last_ttl = Duration::from_secs(step as u64);

        let first = self.bound(series, true, first_ttl).await;
        let last = self.bound(series, false, last_ttl).await;
        Ok((first, last))
    }

    /// Resolve one bound: cache, then store
    async fn bound(&self, series: &str, ascending: bool, ttl: Duration) -> i64 {
        let kind = if ascending { "first" } else { "last" };
        let key = format!("{}:{}", kind, series);

        if let Some(hit) = self.cache_get(kind, &key).await {
            return hit;
        }

        let started = Instant::now();
        let result = tokio::time::timeout(
            self.options.query_timeout,
            self.store.query_bound(series, ascending),
        )
        .await;
        metrics::record_store_query("query_bound", started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(found)) => {
                let ts = found.unwrap_or(0);
                debug!(series, kind, ts, "resolved bound");
                self.cache_set(&key, ts, ttl).await;
                ts
            }
            Ok(Err(e)) => {
                warn!(series, kind, error = %e, "bound query failed");
                metrics::record_error("store", "query_bound");
                0
            }
            Err(_) => {
                warn!(series, kind, "bound query timed out");
                metrics::record_error("timeout", "query_bound");
                0
            }
        }
    }

    async fn cache_get(&self, kind: &str, key: &str) -> Option<i64> {
        let cache = self.cache.as_ref()?;
        let bytes = match cache.get(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "cache get failed, treating as miss");
                None
            }
        };
        let hit = bytes
            .as_deref()
            .and_then(|b| serde_json::from_slice::<i64>(b).ok());
        metrics::record_cache_lookup(kind, hit.is_some());
        hit
    }

    async fn cache_set(&self, key: &str, ts: i64, ttl: Duration) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let bytes = match serde_json::to_vec(&ts) {
            Ok(bytes) => bytes,
            Err(_) => return,
        };
        if let Err(e) = cache.set(key, bytes, ttl).await {
            warn!(key, error = %e, "cache set failed");
        }
    }
}
