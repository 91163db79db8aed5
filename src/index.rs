//! Namespace index: glob pattern resolution over the series namespace
//!
//! Resolves a query pattern into matching leaf series and intermediate branch
//! prefixes. Listing the namespace is the expensive part, so it goes through
//! a two-tier strategy (secondary search index when configured, backing store
//! otherwise) and three independent TTL caches keyed by the literal pattern:
//! the raw series listing, the derived leaves, and the derived branches.
//!
//! Concurrent misses for the same key are collapsed by a per-key single-flight
//! gate: losers of the race wait for the winner and then re-check the cache
//! instead of issuing duplicate backing-store calls.

use crate::error::{Error, IndexError, StoreError};
use crate::metrics;
use crate::pattern::{self, Anchor};
use crate::schema::SchemaResolver;
use crate::store::traits::{MetricCache, SeriesSearch, TimeSeriesStore};
use crate::types::{LeafEntry, Nodes};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Tunables for the namespace index
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// TTL for cached series listings
    pub series_list_ttl: Duration,
    /// TTL for cached leaves and branches
    pub nodes_ttl: Duration,
    /// Budget for any single store or search-index call
    pub query_timeout: Duration,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            series_list_ttl: Duration::from_secs(900),
            nodes_ttl: Duration::from_secs(900),
            query_timeout: Duration::from_secs(5),
        }
    }
}

/// Glob-pattern resolver over the series namespace
pub struct NamespaceIndex {
    store: Arc<dyn TimeSeriesStore>,
    search: Option<Arc<dyn SeriesSearch>>,
    cache: Option<Arc<dyn MetricCache>>,
    schema: Arc<SchemaResolver>,
    options: IndexOptions,
    /// Per-key single-flight gates for cache-miss recomputation
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl NamespaceIndex {
    /// Create a namespace index
    ///
    /// The search index and cache are optional collaborators; their absence
    /// is a valid configuration, not a hidden global fallback.
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        search: Option<Arc<dyn SeriesSearch>>,
        cache: Option<Arc<dyn MetricCache>>,
        schema: Arc<SchemaResolver>,
        options: IndexOptions,
    ) -> Self {
        Self {
            store,
            search,
            cache,
            schema,
            options,
            inflight: DashMap::new(),
        }
    }

    /// Resolve a pattern into leaves followed by branches
    ///
    /// This is the externally exposed entry point: leaves carry their
    /// schema-resolved step, branches are unique namespace prefixes in
    /// first-discovery order.
    pub async fn find_nodes(&self, query_pattern: &str) -> Result<Nodes, Error> {
        let leaves = self.leaves(query_pattern).await?;
        let branches = self.branches(query_pattern).await?;
        Ok(Nodes { leaves, branches })
    }

    /// Leaf series matching the pattern, with resolved steps
    pub async fn leaves(&self, query_pattern: &str) -> Result<Vec<LeafEntry>, Error> {
        let regex = pattern::compile(query_pattern, Anchor::Full)?;
        let key = format!("leaves:{}", query_pattern);

        if let Some(hit) = self.cache_get::<Vec<LeafEntry>>("leaves", &key).await {
            return Ok(hit);
        }
        let _gate = self.acquire_gate(&key).await;
        if let Some(hit) = self.cache_get::<Vec<LeafEntry>>("leaves", &key).await {
            self.release_gate(&key);
            return Ok(hit);
        }

        let names = match self.series_list(query_pattern).await {
            Ok(names) => names,
            Err(e) => {
                self.release_gate(&key);
                return Err(e);
            }
        };

        let leaves: Vec<LeafEntry> = names
            .iter()
            .filter(|name| regex.is_match(name))
            .map(|name| {
                debug!(name = name.as_str(), "found leaf");
                LeafEntry::new(name.clone(), self.schema.resolve(name))
            })
            .collect();

        // The cache write happens before the gate opens so waiters see it.
        self.cache_set("leaves", &key, &leaves, self.options.nodes_ttl)
            .await;
        self.release_gate(&key);
        Ok(leaves)
    }

    /// Unique branch prefixes matching the pattern, in first-discovery order
    ///
    /// Each series name is repeatedly stripped of its last dot-delimited
    /// segment; every unique intermediate prefix is visited exactly once per
    /// call and retained when it matches the end-anchored pattern.
    pub async fn branches(&self, query_pattern: &str) -> Result<Vec<String>, Error> {
        let regex = pattern::compile(query_pattern, Anchor::Full)?;
        let key = format!("branches:{}", query_pattern);

        if let Some(hit) = self.cache_get::<Vec<String>>("branches", &key).await {
            return Ok(hit);
        }
        let _gate = self.acquire_gate(&key).await;
        if let Some(hit) = self.cache_get::<Vec<String>>("branches", &key).await {
            self.release_gate(&key);
            return Ok(hit);
        }

        let names = match self.series_list(query_pattern).await {
            Ok(names) => names,
            Err(e) => {
                self.release_gate(&key);
                return Err(e);
            }
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut branches: Vec<String> = Vec::new();
        for name in &names {
            let mut prefix = name.as_str();
            while let Some((head, _)) = prefix.rsplit_once('.') {
                prefix = head;
                if !seen.insert(prefix.to_string()) {
                    // Deeper prefixes of this name are already recorded too.
                    break;
                }
                if regex.is_match(prefix) {
                    debug!(name = prefix, "found branch");
                    branches.push(prefix.to_string());
                }
            }
        }

        self.cache_set("branches", &key, &branches, self.options.nodes_ttl)
            .await;
        self.release_gate(&key);
        Ok(branches)
    }

    /// The full series listing for a pattern prefix
    ///
    /// Cache-first; on miss the search index is preferred and the store is
    /// the fallback. Both failing surfaces
    /// [`IndexError::SeriesUnavailable`] rather than an empty result, so
    /// callers can tell "no matches" from "could not list".
    pub async fn series_list(&self, query_pattern: &str) -> Result<Vec<String>, Error> {
        let prefix_regex = pattern::to_regex_source(query_pattern, Anchor::Prefix);
        // Validates the pattern before any store contact.
        pattern::compile(query_pattern, Anchor::Prefix)?;
        let key = format!("series:{}", query_pattern);

        if let Some(hit) = self.cache_get::<Vec<String>>("series_list", &key).await {
            return Ok(hit);
        }
        let _gate = self.acquire_gate(&key).await;
        if let Some(hit) = self.cache_get::<Vec<String>>("series_list", &key).await {
            self.release_gate(&key);
            return Ok(hit);
        }

        debug!(
            pattern = query_pattern,
            regex = prefix_regex.as_str(),
            "listing series"
        );
        let names = match self.list_from_backends(query_pattern, &prefix_regex).await {
            Ok(names) => names,
            Err(e) => {
                self.release_gate(&key);
                return Err(e);
            }
        };

        // Data hygiene: names that are not canonical ASCII identifiers are
        // dropped from the listing.
        let names: Vec<String> = names.into_iter().filter(|n| n.is_ascii()).collect();

        self.cache_set("series_list", &key, &names, self.options.series_list_ttl)
            .await;
        self.release_gate(&key);
        Ok(names)
    }

    /// Try each lister strategy in order; first success wins
    async fn list_from_backends(
        &self,
        query_pattern: &str,
        prefix_regex: &str,
    ) -> Result<Vec<String>, Error> {
        let mut last_failure: Option<StoreError> = None;

        if let Some(search) = &self.search {
            match self
                .timed("search_prefix", search.search_prefix(prefix_regex))
                .await
            {
                Ok(names) => return Ok(names),
                Err(e) => {
                    warn!(
                        pattern = query_pattern,
                        error = %e,
                        "search index failed, falling back to store"
                    );
                    metrics::record_error("search_index", "list_series");
                    last_failure = Some(e);
                }
            }
        }

        match self
            .timed("list_series", self.store.list_series(prefix_regex))
            .await
        {
            Ok(names) => Ok(names),
            Err(e) => {
                warn!(pattern = query_pattern, error = %e, "store listing failed");
                metrics::record_error("store", "list_series");
                let reason = match last_failure {
                    Some(first) => format!("search index: {}; store: {}", first, e),
                    None => e.to_string(),
                };
                Err(IndexError::SeriesUnavailable {
                    pattern: query_pattern.to_string(),
                    reason,
                }
                .into())
            }
        }
    }

    /// Wrap an external call with the configured timeout and latency metric
    async fn timed<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.options.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                budget_ms: self.options.query_timeout.as_millis() as u64,
            }),
        };
        metrics::record_store_query(operation, started.elapsed().as_secs_f64());
        result
    }

    /// Acquire the single-flight gate for a cache key
    ///
    /// The returned guard must be held across the recomputation; concurrent
    /// callers for the same key queue on the same mutex and re-check the
    /// cache once they acquire it.
    async fn acquire_gate(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let gate = self
            .inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        gate.lock_owned().await
    }

    /// Drop the gate entry once the computation finished
    ///
    /// A caller arriving after removal creates a fresh gate; the duplicate
    /// computation that allows is idempotent (last writer wins in the cache).
    fn release_gate(&self, key: &str) {
        self.inflight.remove(key);
    }

    /// Cache lookup; any cache error is handled as a miss
    async fn cache_get<T: DeserializeOwned>(&self, kind: &str, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        let bytes = match cache.get(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = key, error = %e, "cache get failed, treating as miss");
                metrics::record_error("cache", "get");
                None
            }
        };
        let hit = bytes
            .as_deref()
            .and_then(|b| serde_json::from_slice::<T>(b).ok());
        metrics::record_cache_lookup(kind, hit.is_some());
        hit
    }

    /// Cache a value; failures are logged, never surfaced
    async fn cache_set<T: Serialize>(&self, kind: &str, key: &str, value: &T, ttl: Duration) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = key, error = %e, "cache encode failed");
                return;
            }
        };
        if let Err(e) = cache.set(key, bytes, ttl).await {
            warn!(key = key, cache = kind, error = %e, "cache set failed");
            metrics::record_error("cache", "set");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::stubs::{MemoryCache, MemoryStore};
    use std::sync::atomic::Ordering;

    fn index_with(
        store: Arc<MemoryStore>,
        search: Option<Arc<dyn SeriesSearch>>,
        cache: Option<Arc<dyn MetricCache>>,
    ) -> NamespaceIndex {
        NamespaceIndex::new(
            store,
            search,
            cache,
            Arc::new(SchemaResolver::with_default(60)),
            IndexOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_leaves_and_branches() {
        let store = Arc::new(MemoryStore::new());
        store.insert_name("a.b.c");
        store.insert_name("a.b.d");
        store.insert_name("a.e");

        let index = index_with(store, None, None);
        let nodes = index.find_nodes("a.*").await.unwrap();

        // Glob matches only one-segment children: a.e is a leaf, a.b is the
        // single branch despite two names producing it.
        assert_eq!(nodes.leaves, vec![LeafEntry::new("a.e", 60)]);
        assert_eq!(nodes.branches, vec!["a.b".to_string()]);
    }

    #[tokio::test]
    async fn test_search_failure_falls_back_to_store() {
        let store = Arc::new(MemoryStore::new());
        store.insert_name("a.x");

        let failing_search = Arc::new(MemoryStore::new());
        failing_search.set_failing(true);

        let index = index_with(store.clone(), Some(failing_search), None);
        let names = index.series_list("a.*").await.unwrap();
        assert_eq!(names, vec!["a.x".to_string()]);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_backends_failing_is_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);

        let index = index_with(store, None, None);
        let err = index.series_list("a.*").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Index(IndexError::SeriesUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_pattern_never_reaches_store() {
        let store = Arc::new(MemoryStore::new());
        let index = index_with(store.clone(), None, None);

        let err = index.series_list("a.{b").await.unwrap_err();
        assert!(matches!(err, Error::Pattern(_)));
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_ascii_names_filtered() {
        let store = Arc::new(MemoryStore::new());
        store.insert_name("a.ok");
        store.insert_name("a.caf\u{e9}");

        let index = index_with(store, None, None);
        let names = index.series_list("a.*").await.unwrap();
        assert_eq!(names, vec!["a.ok".to_string()]);
    }

    #[tokio::test]
    async fn test_series_list_cached() {
        let store = Arc::new(MemoryStore::new());
        store.insert_name("a.x");
        let cache = Arc::new(MemoryCache::new());

        let index = index_with(store.clone(), None, Some(cache));
        index.series_list("a.*").await.unwrap();
        index.series_list("a.*").await.unwrap();
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_failure_degrades_to_recompute() {
        let store = Arc::new(MemoryStore::new());
        store.insert_name("a.x");
        let cache = Arc::new(MemoryCache::new());
        cache.set_failing(true);

        let index = index_with(store.clone(), None, Some(cache));
        // Both calls succeed despite the cache erroring on every access.
        assert!(index.series_list("a.*").await.is_ok());
        assert!(index.series_list("a.*").await.is_ok());
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }
}
