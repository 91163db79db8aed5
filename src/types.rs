//! Core data types used throughout the bridge
//!
//! # Key Types
//!
//! - **`RawPoint`**: a single raw sample (timestamp + optional value)
//! - **`AlignedSeries`**: a fixed-step grid of slots, one per step
//! - **`LeafEntry`**: a queryable series name with its resolved step
//! - **`TimeWindow`**: the `[start, end]` range of a fetch request
//! - **`Nodes`**: the result of a namespace query (leaves + branches)
//!
//! Series names are plain dot-delimited strings (`app.server1.cpu.load`);
//! they act as the key for every per-series cache in the crate.

use serde::{Deserialize, Serialize};

/// A single raw sample from the backing store
///
/// Timestamps are Unix seconds and are not assumed evenly spaced. The value
/// is `None` when the store recorded an explicit null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Sample value, `None` for an explicit null
    pub value: Option<f64>,
}

impl RawPoint {
    /// Create a raw point with a value
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    /// Create a raw point holding an explicit null
    pub fn null(timestamp: i64) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }
}

/// A fixed-step aligned series over a time window
///
/// Slot `i` conceptually represents timestamp `start + i * step`. The slot
/// count is always `round((end - start) / step) + 1`, including for empty
/// input (all slots `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    /// Window start (inclusive), Unix seconds
    pub start: i64,
    /// Window end (inclusive), Unix seconds
    pub end: i64,
    /// Step size in seconds
    pub step: i64,
    /// One slot per grid position; `None` marks "no data"
    pub values: Vec<Option<f64>>,
}

impl AlignedSeries {
    /// Create an all-gap series of the correct length for the window
    pub fn empty(start: i64, end: i64, step: i64) -> Self {
        let slots = Self::slot_count(start, end, step);
        Self {
            start,
            end,
            step,
            values: vec![None; slots],
        }
    }

    /// Number of slots a window produces: `round((end - start) / step) + 1`
    pub fn slot_count(start: i64, end: i64, step: i64) -> usize {
        debug_assert!(step > 0, "step must be positive");
        let steps = ((end - start) as f64 / step as f64).round() as i64;
        (steps.max(0) as usize) + 1
    }

    /// The grid timestamp of slot `i`
    pub fn slot_timestamp(&self, i: usize) -> i64 {
        self.start + self.step * i as i64
    }

    /// True when every slot is "no data"
    pub fn is_all_gaps(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series has no slots (never the case for a valid window)
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A queryable leaf series with its resolved retention step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafEntry {
    /// Full dot-delimited series name
    pub name: String,
    /// Sampling interval in seconds, resolved via the schema rules
    pub step: i64,
}

impl LeafEntry {
    /// Create a leaf entry
    pub fn new(name: impl Into<String>, step: i64) -> Self {
        Self {
            name: name.into(),
            step,
        }
    }
}

/// Time window for fetch requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window start (inclusive), Unix seconds
    pub start: i64,
    /// Window end (inclusive), Unix seconds
    pub end: i64,
}

impl TimeWindow {
    /// Create a window, validating `start <= end`
    pub fn new(start: i64, end: i64) -> Result<Self, String> {
        if start > end {
            return Err(format!("invalid window: start {} > end {}", start, end));
        }
        Ok(Self { start, end })
    }

    /// Window duration in seconds
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// True when the timestamp falls inside the window
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Result of a namespace query: matching leaves followed by branch prefixes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Nodes {
    /// Leaf series matching the pattern, in discovery order
    pub leaves: Vec<LeafEntry>,
    /// Unique branch prefixes matching the pattern, in first-discovery order
    pub branches: Vec<String>,
}
