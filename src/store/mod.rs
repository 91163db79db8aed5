//! Collaborator abstractions for the backing store, search index, and cache

pub mod stubs;
pub mod traits;

pub use stubs::{MemoryCache, MemoryStore};
pub use traits::{MetricCache, SeriesSearch, TimeSeriesStore};
