//! Graphite Bridge - metric namespace resolution and resampling over
//! external time-series backends
//!
//! This library sits between a Graphite-style query frontend and a
//! time-series store that owns the raw samples. It provides:
//! - Glob pattern search over a hierarchical, dot-delimited metric namespace
//! - Retention schema resolution (series name to sampling step)
//! - Resampling of irregular raw samples onto a fixed-step grid with
//!   explicit gaps
//! - Cached data-availability bounds per series
//!
//! The backing store, the optional secondary search index, and the shared
//! cache are injected collaborators; stubs for all three live in
//! [`store::stubs`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod align;
pub mod bounds;
pub mod config;
pub mod error;
pub mod finder;
pub mod index;
pub mod pattern;
pub mod schema;
pub mod store;
pub mod types;

/// Prometheus metrics and telemetry
pub mod metrics;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use finder::{FetchOutcome, Finder, FinderBuilder, GraphiteAdapter};
pub use types::{AlignedSeries, LeafEntry, Nodes, RawPoint, TimeWindow};
