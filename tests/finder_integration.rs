//! Integration tests for the full find/fetch flow
//!
//! These tests validate the complete pipeline over in-memory fakes:
//! - Pattern resolution into leaves and branches
//! - Cache behavior (a warm cache must not reach the store again)
//! - Batched fetches with per-series failure isolation and backfill
//! - Data-availability bounds

use std::sync::atomic::Ordering;
use std::sync::Arc;

use graphite_bridge::config::{Config, SchemaRuleConfig};
use graphite_bridge::store::stubs::{MemoryCache, MemoryStore};
use graphite_bridge::{Finder, GraphiteAdapter, LeafEntry, RawPoint};

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a store pre-loaded with a small namespace
fn create_test_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_name("a.b.c");
    store.insert_name("a.b.d");
    store.insert_name("a.e");
    store.insert_name("integration_test.leaf_node1");
    store.insert_name("integration_test.leaf_node2");
    store.insert_name("other.x");
    store
}

/// Build a finder over the given store with an in-memory cache
fn create_finder(store: Arc<MemoryStore>, cache: Option<Arc<MemoryCache>>) -> Finder {
    let mut builder = Finder::builder().with_store(store);
    if let Some(cache) = cache {
        builder = builder.with_cache(cache);
    }
    builder.build().expect("Failed to build finder")
}

// ============================================================================
// Namespace Resolution
// ============================================================================

#[tokio::test]
async fn test_branch_derivation_deduplicates() {
    let finder = create_finder(create_test_store(), None);

    let nodes = finder.find_nodes("a.*").await.unwrap();

    // a.b.c and a.b.d both produce the prefix a.b, which appears once.
    assert_eq!(nodes.branches, vec!["a.b".to_string()]);
    // Only one-segment children are leaves for this pattern.
    assert_eq!(nodes.leaves, vec![LeafEntry::new("a.e", 60)]);
}

#[tokio::test]
async fn test_leaf_resolution_in_discovery_order() {
    let finder = create_finder(create_test_store(), None);

    let nodes = finder.find_nodes("integration_test.*").await.unwrap();

    let names: Vec<&str> = nodes.leaves.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "integration_test.leaf_node1",
            "integration_test.leaf_node2"
        ]
    );
    assert!(nodes.branches.is_empty());
}

#[tokio::test]
async fn test_leaves_carry_schema_steps() {
    let store = create_test_store();
    let mut config = Config::default();
    config.schema.rules.push(SchemaRuleConfig {
        pattern: "^integration_test\\.".to_string(),
        step: 10,
    });

    let finder = Finder::builder()
        .with_store(store)
        .with_config(config)
        .build()
        .unwrap();

    let nodes = finder.find_nodes("integration_test.*").await.unwrap();
    assert!(nodes.leaves.iter().all(|l| l.step == 10));

    let nodes = finder.find_nodes("a.*").await.unwrap();
    assert!(nodes.leaves.iter().all(|l| l.step == 60));
}

#[tokio::test]
async fn test_invalid_pattern_is_rejected_locally() {
    let store = create_test_store();
    let finder = create_finder(store.clone(), None);

    assert!(finder.find_nodes("a.{b").await.is_err());
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unavailable_listing_is_an_error_not_empty() {
    let store = create_test_store();
    store.set_failing(true);
    let finder = create_finder(store, None);

    // Must be an explicit error, never an empty node set.
    assert!(finder.find_nodes("a.*").await.is_err());
}

// ============================================================================
// Cache Behavior
// ============================================================================

#[tokio::test]
async fn test_warm_cache_skips_store() {
    let store = create_test_store();
    let cache = Arc::new(MemoryCache::new());
    let finder = create_finder(store.clone(), Some(cache));

    let first = finder.find_nodes("a.*").await.unwrap();
    let calls_after_first = store.list_calls.load(Ordering::SeqCst);
    let second = finder.find_nodes("a.*").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.list_calls.load(Ordering::SeqCst), calls_after_first);
}

#[tokio::test]
async fn test_concurrent_misses_share_one_listing() {
    let store = create_test_store();
    let cache = Arc::new(MemoryCache::new());
    let finder = Arc::new(create_finder(store.clone(), Some(cache)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let f = finder.clone();
        handles.push(tokio::spawn(async move { f.find_nodes("a.*").await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    // Single-flight: the hot pattern resolves its listing once, not eight
    // times. Leaves and branches share the same cached listing.
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Fetch
// ============================================================================

#[tokio::test]
async fn test_fetch_many_backfills_missing_series() {
    let store = Arc::new(MemoryStore::new());
    store.insert_series(
        "x",
        vec![RawPoint::new(0, 1.0), RawPoint::new(60, 2.0)],
    );
    // "y" is known but has no samples; the store omits it from range results.
    store.insert_name("y");
    let finder = create_finder(store, None);

    let out = finder
        .fetch_many(&["x".to_string(), "y".to_string()], 0, 120)
        .await
        .unwrap();

    assert!(out.failures.is_empty());
    assert_eq!(out.series["x"].values, vec![Some(1.0), Some(2.0), None]);
    let y = &out.series["y"];
    assert_eq!(y.len(), 3);
    assert!(y.is_all_gaps());
}

#[tokio::test]
async fn test_fetch_many_groups_by_step() {
    let store = Arc::new(MemoryStore::new());
    store.insert_series("fast.metric", vec![RawPoint::new(0, 1.0)]);
    store.insert_series("slow.metric", vec![RawPoint::new(0, 2.0)]);

    let mut config = Config::default();
    config.schema.rules.push(SchemaRuleConfig {
        pattern: "^fast\\.".to_string(),
        step: 10,
    });
    let finder = Finder::builder()
        .with_store(store.clone())
        .with_config(config)
        .build()
        .unwrap();

    let out = finder
        .fetch_many(&["fast.metric".to_string(), "slow.metric".to_string()], 0, 120)
        .await
        .unwrap();

    // Two distinct steps mean two range queries and two grid lengths.
    assert_eq!(store.range_calls.load(Ordering::SeqCst), 2);
    assert_eq!(out.series["fast.metric"].len(), 13);
    assert_eq!(out.series["slow.metric"].len(), 3);
}

#[tokio::test]
async fn test_fetch_one_round_trip() {
    let store = Arc::new(MemoryStore::new());
    store.insert_series(
        "app.server1.cpu.load",
        vec![
            RawPoint::new(1000, 0.5),
            RawPoint::new(1060, 0.7),
            RawPoint::new(1124, 0.9),
        ],
    );
    let finder = create_finder(store, None);

    let s = finder.fetch_one("app.server1.cpu.load", 1000, 1300).await.unwrap();
    assert_eq!(s.len(), 6);
    assert_eq!(s.values[0], Some(0.5));
    assert_eq!(s.values[1], Some(0.7));
    assert_eq!(s.values[2], Some(0.9));
    assert_eq!(s.values[3], None);
}

// ============================================================================
// Bounds
// ============================================================================

#[tokio::test]
async fn test_bounds_round_trip() {
    let store = Arc::new(MemoryStore::new());
    store.insert_series(
        "x",
        vec![RawPoint::new(500, 1.0), RawPoint::new(9_000, 2.0)],
    );
    let finder = create_finder(store, None);

    assert_eq!(finder.get_bounds("x").await.unwrap(), (500, 9_000));
}

#[tokio::test]
async fn test_bounds_cached_between_calls() {
    let store = Arc::new(MemoryStore::new());
    store.insert_series("x", vec![RawPoint::new(500, 1.0)]);
    let cache = Arc::new(MemoryCache::new());
    let finder = create_finder(store.clone(), Some(cache));

    finder.get_bounds("x").await.unwrap();
    finder.get_bounds("x").await.unwrap();

    // First and last resolved once each; the second request is all cache.
    assert_eq!(store.bound_calls.load(Ordering::SeqCst), 2);
}
