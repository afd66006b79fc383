//! Distance, speed and aggregate statistics over a location trail.
//!
//! Consecutive-pair computations ([`total_distance`], [`average_speed`],
//! [`max_speed`], [`segments`]) walk the trail **in the order given**. They
//! only describe the actual path when the caller has sorted the trail by
//! ascending timestamp (see [`crate::sort_by_timestamp`]); nothing here sorts
//! on the caller's behalf. [`total_active_time`] is the one exception: it uses
//! the minimum and maximum timestamps and so does not depend on order.
//!
//! Every function returns zero for trails with fewer than two fixes.
//!
//! ## Example
//! ```rust
//! use geotracker::{LocationFix, metrics::TrailSummary};
//!
//! let trail = vec![
//!     LocationFix::from_epoch_millis(0.0, 0.0, 5.0, 0).unwrap(),
//!     LocationFix::from_epoch_millis(0.0, 0.009, 5.0, 1_000_000).unwrap(),
//! ];
//! let summary = TrailSummary::from_fixes(&trail);
//! assert!((summary.total_distance_m - 1000.0).abs() < 10.0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{bearing, compute_center, fix_distance};
use crate::{Bounds, GpsPoint, LocationFix};

/// Conversion factor from meters per second to kilometres per hour.
pub const MS_TO_KMH: f64 = 3.6;

/// Absolute time between two fixes in seconds, at microsecond resolution.
fn elapsed_seconds(a: &LocationFix, b: &LocationFix) -> f64 {
    let delta = b.timestamp - a.timestamp;
    match delta.num_microseconds() {
        Some(us) => (us as f64 / 1_000_000.0).abs(),
        // Spans beyond ~292k years overflow microseconds
        None => (delta.num_milliseconds() as f64 / 1000.0).abs(),
    }
}

// ============================================================================
// Per-segment
// ============================================================================

/// Speed in km/h between two fixes.
///
/// Uses the absolute time difference, so argument order does not matter.
/// Returns 0 when both fixes carry the same timestamp.
pub fn segment_speed(a: &LocationFix, b: &LocationFix) -> f64 {
    let seconds = elapsed_seconds(a, b);
    if seconds == 0.0 {
        return 0.0;
    }
    fix_distance(a, b) / seconds * MS_TO_KMH
}

/// One leg between two consecutive fixes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Great-circle length in meters
    pub distance_m: f64,
    /// `to.timestamp - from.timestamp` in milliseconds (negative if the
    /// trail was not sorted)
    pub duration_ms: i64,
    /// Speed in km/h, 0 for equal timestamps
    pub speed_kmh: f64,
    /// Initial bearing in degrees, 0 = north
    pub bearing_deg: f64,
}

impl Segment {
    /// Build the segment from `from` to `to`.
    pub fn between(from: &LocationFix, to: &LocationFix) -> Self {
        Self {
            distance_m: fix_distance(from, to),
            duration_ms: (to.timestamp - from.timestamp).num_milliseconds(),
            speed_kmh: segment_speed(from, to),
            bearing_deg: bearing(&from.point(), &to.point()),
        }
    }
}

/// Segments between every consecutive pair, in the given order.
pub fn segments(fixes: &[LocationFix]) -> Vec<Segment> {
    fixes
        .windows(2)
        .map(|w| Segment::between(&w[0], &w[1]))
        .collect()
}

// ============================================================================
// Aggregates
// ============================================================================

/// Sum of great-circle distances over consecutive pairs, in meters.
pub fn total_distance(fixes: &[LocationFix]) -> f64 {
    if fixes.len() < 2 {
        return 0.0;
    }

    fixes.windows(2).map(|w| fix_distance(&w[0], &w[1])).sum()
}

/// Path distance over wall-clock span, in km/h.
///
/// The span is measured between the first and last element *as given*, not
/// summed per segment and not the min/max timestamp. Feeding an unsorted
/// trail gives a meaningless (but finite) answer; sorting is the caller's job.
/// Returns 0 for fewer than two fixes or a zero span.
pub fn average_speed(fixes: &[LocationFix]) -> f64 {
    let (first, last) = match (fixes.first(), fixes.last()) {
        (Some(first), Some(last)) if fixes.len() >= 2 => (first, last),
        _ => return 0.0,
    };

    let seconds = elapsed_seconds(first, last);
    if seconds == 0.0 {
        return 0.0;
    }
    total_distance(fixes) / seconds * MS_TO_KMH
}

/// Fastest single segment, in km/h.
pub fn max_speed(fixes: &[LocationFix]) -> f64 {
    fixes
        .windows(2)
        .map(|w| segment_speed(&w[0], &w[1]))
        .fold(0.0, f64::max)
}

/// Time between the earliest and latest fix in milliseconds, regardless of order.
pub fn total_active_time(fixes: &[LocationFix]) -> i64 {
    if fixes.len() < 2 {
        return 0;
    }

    let min = fixes.iter().map(|f| f.timestamp).min();
    let max = fixes.iter().map(|f| f.timestamp).max();
    match (min, max) {
        (Some(min), Some(max)) => (max - min).num_milliseconds(),
        _ => 0,
    }
}

// ============================================================================
// Reporting gaps
// ============================================================================

/// A stretch between consecutive fixes in which at least one scheduled
/// report never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportingGap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_ms: i64,
    /// Reports expected at the configured cadence but not received
    pub missed_reports: u32,
}

/// Consecutive pairs further apart than twice the reporting interval.
///
/// Walks the trail in the given order, so an unsorted trail's backward
/// steps are never reported. Returns nothing for a zero interval.
pub fn reporting_gaps(fixes: &[LocationFix], interval_secs: u64) -> Vec<ReportingGap> {
    if interval_secs == 0 {
        return Vec::new();
    }
    let interval_ms = interval_secs.saturating_mul(1000).min(i64::MAX as u64) as i64;

    fixes
        .windows(2)
        .filter_map(|w| {
            let duration_ms = (w[1].timestamp - w[0].timestamp).num_milliseconds();
            if duration_ms <= interval_ms.saturating_mul(2) {
                return None;
            }
            let missed = (duration_ms - 1) / interval_ms;
            Some(ReportingGap {
                start: w[0].timestamp,
                end: w[1].timestamp,
                duration_ms,
                missed_reports: missed.min(u32::MAX as i64) as u32,
            })
        })
        .collect()
}

// ============================================================================
// Summary
// ============================================================================

/// All aggregate statistics for one trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailSummary {
    pub fix_count: u32,
    /// Meters
    pub total_distance_m: f64,
    /// km/h
    pub average_speed_kmh: f64,
    /// km/h
    pub max_speed_kmh: f64,
    /// Milliseconds between earliest and latest fix
    pub total_active_time_ms: i64,
    /// Timestamp of the first fix in the given order
    pub first_timestamp: Option<DateTime<Utc>>,
    /// Timestamp of the last fix in the given order
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Map viewport for the trail
    pub bounds: Option<Bounds>,
    pub center: Option<GpsPoint>,
}

impl TrailSummary {
    /// Compute every statistic over the trail in the given order.
    pub fn from_fixes(fixes: &[LocationFix]) -> Self {
        Self {
            fix_count: fixes.len() as u32,
            total_distance_m: total_distance(fixes),
            average_speed_kmh: average_speed(fixes),
            max_speed_kmh: max_speed(fixes),
            total_active_time_ms: total_active_time(fixes),
            first_timestamp: fixes.first().map(|f| f.timestamp),
            last_timestamp: fixes.last().map(|f| f.timestamp),
            bounds: Bounds::from_fixes(fixes),
            center: compute_center(fixes),
        }
    }

    /// True when the trail has fewer than two fixes and so no movement data.
    pub fn is_empty(&self) -> bool {
        self.fix_count < 2
    }
}

// ============================================================================
// Tests
// ============================================================================
