//! Dwell-time clustering.
//!
//! Splits a trail into maximal runs of consecutive fixes that stay within a
//! radius of the run's *first* fix. The anchor never moves: a slow drift away
//! from the starting point eventually opens a new cluster even though every
//! individual step is small. This is a streaming partition, not general
//! spatial clustering; two visits to the same place produce two clusters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo_utils::fix_distance;
use crate::LocationFix;

/// One run of fixes around an anchor point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellCluster {
    /// Latitude of the cluster's first fix
    pub centroid_lat: f64,
    /// Longitude of the cluster's first fix
    pub centroid_lon: f64,
    /// Last member timestamp minus first member timestamp
    pub duration_ms: i64,
    pub fix_count: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

struct OpenCluster<'a> {
    anchor: &'a LocationFix,
    last: &'a LocationFix,
    count: u32,
}

impl<'a> OpenCluster<'a> {
    fn start(anchor: &'a LocationFix) -> Self {
        Self {
            anchor,
            last: anchor,
            count: 1,
        }
    }

    fn close(self) -> DwellCluster {
        DwellCluster {
            centroid_lat: self.anchor.latitude,
            centroid_lon: self.anchor.longitude,
            duration_ms: (self.last.timestamp - self.anchor.timestamp).num_milliseconds(),
            fix_count: self.count,
            start: self.anchor.timestamp,
            end: self.last.timestamp,
        }
    }
}

/// Partition the trail into dwell clusters in a single left-to-right pass.
///
/// A fix joins the open cluster when its distance from the cluster's first fix
/// is at most `threshold_meters`; otherwise the cluster closes and a new one
/// starts at that fix. An empty trail gives no clusters; a single fix gives
/// one cluster of duration 0.
///
/// # Example
/// ```
/// use geotracker::{LocationFix, dwell_times};
///
/// let trail = vec![
///     LocationFix::from_epoch_millis(0.0, 0.0, 5.0, 0).unwrap(),
///     LocationFix::from_epoch_millis(0.0, 0.0001, 5.0, 60_000).unwrap(),
///     LocationFix::from_epoch_millis(0.0, 0.01, 5.0, 120_000).unwrap(),
/// ];
/// let clusters = dwell_times(&trail, 50.0);
/// assert_eq!(clusters.len(), 2);
/// assert_eq!(clusters[0].fix_count, 2);
/// ```
pub fn dwell_times(fixes: &[LocationFix], threshold_meters: f64) -> Vec<DwellCluster> {
    let mut iter = fixes.iter();
    let mut open = match iter.next() {
        Some(first) => OpenCluster::start(first),
        None => return vec![],
    };

    let mut clusters = Vec::new();
    for fix in iter {
        if fix_distance(open.anchor, fix) <= threshold_meters {
            open.last = fix;
            open.count += 1;
        } else {
            clusters.push(open.close());
            open = OpenCluster::start(fix);
        }
    }
    clusters.push(open.close());

    clusters
}

/// Dwell clusters lasting at least `min_duration_ms`, i.e. actual stops.
pub fn significant_dwells(
    fixes: &[LocationFix],
    threshold_meters: f64,
    min_duration_ms: i64,
) -> Vec<DwellCluster> {
    dwell_times(fixes, threshold_meters)
        .into_iter()
        .filter(|c| c.duration_ms >= min_duration_ms)
        .collect()
}
