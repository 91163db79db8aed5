//! Fixed-grid resampling of raw samples
//!
//! The backing store returns samples at irregular timestamps; downstream
//! consumers require one value per step over the requested window, with gaps
//! represented explicitly. [`align`] reshapes a raw sample list onto that
//! grid, handling missing, duplicate, and jittered samples in a single
//! forward pass. [`align_multi`] applies it across a batch, backfilling
//! series the store omitted entirely.
//!
//! Everything here is pure and stateless; concurrent use needs no
//! coordination.

use crate::types::{AlignedSeries, RawPoint};
use std::collections::HashMap;

/// Resample raw points onto a fixed-step grid
///
/// Produces exactly `round((end - start) / step) + 1` slots; slot `i`
/// represents `start + i * step`. A slot holds the value of the point within
/// half a step of its grid timestamp, or "no data" when none is close enough.
///
/// When the input count matches the slot count exactly, the points are
/// assumed perfectly aligned and mapped positionally. Otherwise a single
/// forward pointer walks the points: it catches up past points more than half
/// a step behind the current grid target (jitter denser than the grid),
/// consumes a point within half a step, and leaves a gap otherwise without
/// advancing. A point skipped by the catch-up loop is gone for good; when
/// two points fall in the same bucket the forward-consumption order decides
/// which one survives.
///
/// # Preconditions
///
/// `step > 0`, and `points` sorted ascending by timestamp. The caller owns
/// sorting; this is asserted in debug builds only.
pub fn align(points: &[RawPoint], start: i64, end: i64, step: i64) -> AlignedSeries {
    debug_assert!(step > 0, "step must be positive");
    debug_assert!(
        points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
        "points must be sorted ascending by timestamp"
    );

    let slots = AlignedSeries::slot_count(start, end, step);
    let mut values: Vec<Option<f64>> = vec![None; slots];

    // Fast path: exact count match means a perfectly aligned response.
    if points.len() == slots {
        for (slot, point) in values.iter_mut().zip(points.iter()) {
            *slot = point.value;
        }
        return AlignedSeries {
            start,
            end,
            step,
            values,
        };
    }

    let mut ptr = 0usize;
    for (s, slot) in values.iter_mut().enumerate() {
        if ptr >= points.len() {
            // Pointer exhausted: this and all remaining slots stay gaps.
            break;
        }
        let target = start + step * s as i64;
        let mut diff = points[ptr].timestamp - target;

        // Catch up while the current point is more than half a step before
        // the target. Comparisons are doubled to avoid integer halving.
        while 2 * diff < -step && ptr + 1 < points.len() {
            ptr += 1;
            diff = points[ptr].timestamp - target;
        }

        if 2 * diff.abs() <= step {
            *slot = points[ptr].value;
            ptr += 1;
        }
        // Otherwise the point belongs to a later bucket; leave the gap and
        // keep the pointer where it is.
    }

    AlignedSeries {
        start,
        end,
        step,
        values,
    }
}

/// Resample a batch of series onto the same grid
///
/// Applies [`align`] independently to every series. Distributed stores omit
/// series with zero matching samples from their response, so the caller's
/// `expected` key set is reconciled against the data: missing series are
/// backfilled with empty input and come out as all-gap series of correct
/// length. Series present in `data` but absent from `expected` are aligned
/// too.
pub fn align_multi(
    data: &HashMap<String, Vec<RawPoint>>,
    expected: &[String],
    start: i64,
    end: i64,
    step: i64,
) -> HashMap<String, AlignedSeries> {
    let mut out = HashMap::with_capacity(expected.len().max(data.len()));
    for name in expected {
        let points = data.get(name).map(Vec::as_slice).unwrap_or(&[]);
        out.insert(name.clone(), align(points, start, end, step));
    }
    for (name, points) in data {
        if !out.contains_key(name) {
            out.insert(name.clone(), align(points, start, end, step));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(i64, f64)]) -> Vec<RawPoint> {
        raw.iter().map(|&(t, v)| RawPoint::new(t, v)).collect()
    }

    #[test]
    fn test_empty_input_is_all_gaps() {
        let s = align(&[], 1000, 1600, 60);
        assert_eq!(s.len(), 11);
        assert!(s.is_all_gaps());
    }

    #[test]
    fn test_exact_alignment_fast_path() {
        let points = pts(&[
            (0, 0.0),
            (60, 1.0),
            (120, 2.0),
            (180, 3.0),
            (240, 4.0),
        ]);
        let s = align(&points, 0, 240, 60);
        assert_eq!(
            s.values,
            vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0), Some(4.0)]
        );
    }

    #[test]
    fn test_jittered_points_snap_to_buckets() {
        // Slightly off-grid points still land on their nearest slots.
        let points = pts(&[(3, 1.0), (58, 2.0), (124, 3.0)]);
        let s = align(&points, 0, 240, 60);
        assert_eq!(s.values, vec![Some(1.0), Some(2.0), Some(3.0), None, None]);
    }

    #[test]
    fn test_single_straggler_point() {
        let points = pts(&[(180, 7.0)]);
        let s = align(&points, 0, 600, 60);
        assert_eq!(s.len(), 11);
        assert_eq!(s.values[3], Some(7.0));
        assert_eq!(s.values.iter().filter(|v| v.is_some()).count(), 1);
    }

    #[test]
    fn test_dense_points_catch_up() {
        // Four points inside one step: catch-up discards all but the one
        // that lands within half a step of each target.
        let points = pts(&[(10, 1.0), (20, 2.0), (25, 3.0), (55, 4.0)]);
        let s = align(&points, 0, 120, 60);
        // target 0: 10 is within 30 -> 1.0; target 60: catch up past 20, 25,
        // then 55 is within 30 -> 4.0; target 120: exhausted.
        assert_eq!(s.values, vec![Some(1.0), Some(4.0), None]);
    }

    #[test]
    fn test_multi_point_bucket_fixture() {
        // Pinned fixture: points at start+60, +190, +210, +240 with step=60
        // over a 10-minute window. Forward consumption gives slot 3 the
        // 190-value and slot 4 the 210-value; the 240-value is a full step
        // behind by slot 5 and is dropped.
        let start = 1_000_000;
        let points = pts(&[
            (start + 60, 1.0),
            (start + 190, 2.0),
            (start + 210, 3.0),
            (start + 240, 4.0),
        ]);
        let s = align(&points, start, start + 600, 60);
        assert_eq!(
            s.values,
            vec![
                None,
                Some(1.0),
                None,
                Some(2.0),
                Some(3.0),
                None,
                None,
                None,
                None,
                None,
                None
            ]
        );
    }

    #[test]
    fn test_null_values_preserved() {
        // An explicit null consumes its bucket like any other point.
        let points = vec![
            RawPoint::new(0, 1.0),
            RawPoint::null(60),
            RawPoint::new(120, 3.0),
        ];
        let s = align(&points, 0, 240, 60);
        assert_eq!(s.values, vec![Some(1.0), None, Some(3.0), None, None]);
    }

    #[test]
    fn test_half_step_boundary_consumes() {
        // A point exactly half a step away still counts for the bucket.
        let points = pts(&[(30, 5.0)]);
        let s = align(&points, 0, 120, 60);
        assert_eq!(s.values, vec![Some(5.0), None, None]);
    }

    #[test]
    fn test_align_multi_backfills_missing() {
        let mut data = HashMap::new();
        data.insert("x".to_string(), pts(&[(0, 1.0), (60, 2.0)]));
        let expected = vec!["x".to_string(), "y".to_string()];

        let out = align_multi(&data, &expected, 0, 120, 60);
        assert_eq!(out.len(), 2);
        assert_eq!(out["x"].values, vec![Some(1.0), Some(2.0), None]);
        assert!(out["y"].is_all_gaps());
        assert_eq!(out["y"].len(), 3);
    }

    #[test]
    fn test_align_multi_keeps_unexpected_series() {
        let mut data = HashMap::new();
        data.insert("extra".to_string(), pts(&[(0, 9.0)]));
        let out = align_multi(&data, &[], 0, 120, 60);
        assert_eq!(out["extra"].values[0], Some(9.0));
    }
}
