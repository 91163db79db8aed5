//! Prometheus metrics for the bridge
//!
//! Counters and histograms for the namespace index, caches, and store
//! queries. The registry is process-global; a host serving layer decides
//! whether and where to expose it.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    // === Request Counters ===

    /// Total namespace queries by outcome
    pub static ref FINDS_TOTAL: CounterVec = register_counter_vec!(
        "bridge_finds_total",
        "Total namespace queries",
        &["status"]
    ).unwrap();

    /// Total fetch operations by kind and outcome
    pub static ref FETCHES_TOTAL: CounterVec = register_counter_vec!(
        "bridge_fetches_total",
        "Total fetch operations",
        &["kind", "status"]
    ).unwrap();

    // === Cache Counters ===

    /// Cache hits by cache kind
    pub static ref CACHE_HITS: CounterVec = register_counter_vec!(
        "bridge_cache_hits_total",
        "Cache hits by cache kind",
        &["cache"]
    ).unwrap();

    /// Cache misses by cache kind
    pub static ref CACHE_MISSES: CounterVec = register_counter_vec!(
        "bridge_cache_misses_total",
        "Cache misses by cache kind",
        &["cache"]
    ).unwrap();

    // === Store Latency ===

    /// Store and search-index query latency by operation
    pub static ref STORE_QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "bridge_store_query_duration_seconds",
        "Backing store query latency in seconds",
        &["operation"],
        vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    ).unwrap();

    // === Error Counters ===

    /// Total errors by type and operation
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "bridge_errors_total",
        "Total errors by type and operation",
        &["error_type", "operation"]
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a cache lookup outcome
#[inline]
pub fn record_cache_lookup(cache: &str, hit: bool) {
    if hit {
        CACHE_HITS.with_label_values(&[cache]).inc();
    } else {
        CACHE_MISSES.with_label_values(&[cache]).inc();
    }
}

/// Record a store query with its latency
#[inline]
pub fn record_store_query(operation: &str, duration_secs: f64) {
    STORE_QUERY_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Record an error
#[inline]
pub fn record_error(error_type: &str, operation: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, operation])
        .inc();
}

/// Record a namespace query outcome
#[inline]
pub fn record_find(success: bool) {
    let status = if success { "success" } else { "error" };
    FINDS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a fetch outcome
#[inline]
pub fn record_fetch(kind: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    FETCHES_TOTAL.with_label_values(&[kind, status]).inc();
}
