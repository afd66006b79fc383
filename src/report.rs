//! Per-tracker reports for the analytics dashboard.
//!
//! Unlike the functions in [`crate::metrics`], reports own their ordering:
//! each one works on a copy of the trail sorted by ascending timestamp, so a
//! report is meaningful whatever order the fixes arrived in.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::buckets::{daily_distance, fixes_per_day, hourly_histogram, HOURS_PER_DAY};
use crate::config::AnalyticsConfig;
use crate::dwell::{significant_dwells, DwellCluster};
use crate::error::Result;
use crate::metrics::{reporting_gaps, ReportingGap, TrailSummary};
use crate::store::TrailStore;
use crate::{sorted_by_timestamp, LocationFix};

/// Everything the dashboard shows for one tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailReport {
    pub tracker_id: String,
    pub summary: TrailSummary,
    /// Stops lasting at least `min_dwell_ms`
    pub stops: Vec<DwellCluster>,
    /// Fix count per local hour, index = hour
    pub hourly_histogram: [usize; HOURS_PER_DAY as usize],
    /// Fix count per local calendar day
    pub fixes_per_day: BTreeMap<String, u32>,
    /// Meters per local calendar day
    pub daily_distance_m: BTreeMap<String, f64>,
    /// Holes in the `reporting_interval_secs` cadence
    pub reporting_gaps: Vec<ReportingGap>,
}

/// Build the report for one trail.
pub fn build_report(tracker_id: &str, fixes: &[LocationFix], config: &AnalyticsConfig) -> TrailReport {
    let sorted = sorted_by_timestamp(fixes);

    TrailReport {
        tracker_id: tracker_id.to_string(),
        summary: TrailSummary::from_fixes(&sorted),
        stops: significant_dwells(&sorted, config.dwell_threshold_meters, config.min_dwell_ms),
        hourly_histogram: hourly_histogram(&sorted),
        fixes_per_day: fixes_per_day(&sorted),
        daily_distance_m: daily_distance(&sorted),
        reporting_gaps: reporting_gaps(&sorted, config.reporting_interval_secs),
    }
}

/// Build reports for every tracker in the store, ordered by tracker id.
pub fn build_reports(store: &TrailStore, config: &AnalyticsConfig) -> Vec<TrailReport> {
    let ids = store.tracker_ids();

    #[cfg(feature = "parallel")]
    let reports: Vec<TrailReport> = ids
        .par_iter()
        .map(|id| build_report(id, store.trail(id).unwrap_or_default(), config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let reports: Vec<TrailReport> = ids
        .iter()
        .map(|id| build_report(id, store.trail(id).unwrap_or_default(), config))
        .collect();

    info!(
        "[Report] Built {} reports over {} fixes",
        reports.len(),
        store.total_fixes()
    );

    reports
}

/// Serialise reports for the dashboard.
pub fn reports_to_json(reports: &[TrailReport]) -> Result<String> {
    Ok(serde_json::to_string(reports)?)
}
