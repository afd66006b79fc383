//! Temporal bucketing of fixes for activity histograms.
//!
//! Hours and calendar days are taken in the **host's local timezone**
//! ([`chrono::Local`]), so a dashboard shows "when did they move" in the
//! viewer's own time. This interpretation is fixed; callers needing UTC or a
//! per-tracker timezone must bucket on their side.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone, Timelike};

use crate::geo_utils::fix_distance;
use crate::LocationFix;

/// Number of hour-of-day buckets.
pub const HOURS_PER_DAY: u32 = 24;

/// Fixes grouped by local hour of day.
///
/// Always contains all 24 keys `0..=23`, with empty lists for hours without
/// fixes, so a full-day histogram can be drawn directly.
pub fn by_hour_of_day(fixes: &[LocationFix]) -> BTreeMap<u32, Vec<&LocationFix>> {
    by_hour_of_day_in(fixes, &Local)
}

/// Fixes grouped by local calendar day, keyed `"YYYY-MM-DD"`.
///
/// Only days with at least one fix appear.
pub fn by_calendar_day(fixes: &[LocationFix]) -> BTreeMap<String, Vec<&LocationFix>> {
    by_calendar_day_in(fixes, &Local)
}

/// Number of fixes per local hour of day.
pub fn hourly_histogram(fixes: &[LocationFix]) -> [usize; HOURS_PER_DAY as usize] {
    let mut counts = [0usize; HOURS_PER_DAY as usize];
    for (hour, bucket) in by_hour_of_day(fixes) {
        counts[hour as usize] = bucket.len();
    }
    counts
}

/// Number of fixes per local calendar day.
pub fn fixes_per_day(fixes: &[LocationFix]) -> BTreeMap<String, u32> {
    by_calendar_day(fixes)
        .into_iter()
        .map(|(day, bucket)| (day, bucket.len() as u32))
        .collect()
}

/// Meters travelled per local calendar day.
///
/// Walks consecutive pairs in the given order and credits a segment to a day
/// only when both of its fixes fall on that day; segments spanning midnight
/// are dropped rather than split.
pub fn daily_distance(fixes: &[LocationFix]) -> BTreeMap<String, f64> {
    daily_distance_in(fixes, &Local)
}

pub(crate) fn by_hour_of_day_in<'a, Tz: TimeZone>(
    fixes: &'a [LocationFix],
    tz: &Tz,
) -> BTreeMap<u32, Vec<&'a LocationFix>> {
    let mut buckets: BTreeMap<u32, Vec<&LocationFix>> =
        (0..HOURS_PER_DAY).map(|h| (h, Vec::new())).collect();

    for fix in fixes {
        let hour = fix.timestamp.with_timezone(tz).hour();
        buckets.entry(hour).or_default().push(fix);
    }

    buckets
}

pub(crate) fn by_calendar_day_in<'a, Tz: TimeZone>(
    fixes: &'a [LocationFix],
    tz: &Tz,
) -> BTreeMap<String, Vec<&'a LocationFix>> {
    let mut buckets: BTreeMap<String, Vec<&LocationFix>> = BTreeMap::new();

    for fix in fixes {
        buckets.entry(day_key(fix, tz)).or_default().push(fix);
    }

    buckets
}

pub(crate) fn daily_distance_in<Tz: TimeZone>(fixes: &[LocationFix], tz: &Tz) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();

    for pair in fixes.windows(2) {
        let day = day_key(&pair[0], tz);
        let distance = fix_distance(&pair[0], &pair[1]);
        let same_day = day == day_key(&pair[1], tz);
        let total = totals.entry(day).or_insert(0.0);
        if same_day {
            *total += distance;
        }
    }
    if let Some(last) = fixes.last() {
        totals.entry(day_key(last, tz)).or_insert(0.0);
    }

    totals
}

fn day_key<Tz: TimeZone>(fix: &LocationFix, tz: &Tz) -> String {
    fix.timestamp
        .with_timezone(tz)
        .date_naive()
        .format("%Y-%m-%d")
        .to_string()
}
