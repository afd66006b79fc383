//! # Trail Store
//!
//! In-memory trails keyed by tracker id, feeding the analytics.
//!
//! Two ways to change a trail:
//! - [`TrailStore::record_fix`] appends a newly reported fix. History is
//!   never overwritten: replacing a tracker's trail with only its latest fix
//!   would leave nothing to compute distance, speed or dwell times from.
//! - [`TrailStore::replace_snapshot`] installs a full trail fetched from (or
//!   pushed by) the external source of truth. The newest snapshot wins
//!   outright; nothing is merged.
//!
//! Fixes are validated here, at ingestion, so analytics can assume valid
//! coordinates.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::LocationFix;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailStore {
    trails: HashMap<String, Vec<LocationFix>>,
}

impl TrailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fix to a tracker's trail, creating the trail if needed.
    pub fn record_fix(&mut self, tracker_id: &str, fix: LocationFix) -> Result<()> {
        fix.validate(tracker_id)?;
        let trail = self.trails.entry(tracker_id.to_string()).or_default();
        trail.push(fix);
        debug!("[TrailStore] {} now has {} fixes", tracker_id, trail.len());
        Ok(())
    }

    /// Append several fixes. Nothing is appended if any fix is invalid.
    pub fn record_fixes(&mut self, tracker_id: &str, fixes: Vec<LocationFix>) -> Result<usize> {
        for fix in &fixes {
            fix.validate(tracker_id)?;
        }
        let count = fixes.len();
        self.trails
            .entry(tracker_id.to_string())
            .or_default()
            .extend(fixes);
        Ok(count)
    }

    /// Replace a tracker's trail with a full snapshot (last write wins).
    ///
    /// The previous trail is kept if the snapshot contains an invalid fix.
    pub fn replace_snapshot(&mut self, tracker_id: &str, fixes: Vec<LocationFix>) -> Result<()> {
        for fix in &fixes {
            fix.validate(tracker_id)?;
        }
        let previous = self
            .trails
            .insert(tracker_id.to_string(), fixes)
            .map_or(0, |t| t.len());
        info!(
            "[TrailStore] Snapshot for {}: {} -> {} fixes",
            tracker_id,
            previous,
            self.trails.get(tracker_id).map_or(0, |t| t.len())
        );
        Ok(())
    }

    /// Trail in arrival order.
    pub fn trail(&self, tracker_id: &str) -> Option<&[LocationFix]> {
        self.trails.get(tracker_id).map(|t| t.as_slice())
    }

    /// Copy of the trail sorted by ascending timestamp; empty for unknown ids.
    pub fn sorted_trail(&self, tracker_id: &str) -> Vec<LocationFix> {
        self.trail(tracker_id)
            .map(crate::sorted_by_timestamp)
            .unwrap_or_default()
    }

    /// Most recent fix by timestamp, whatever order it arrived in.
    pub fn latest_fix(&self, tracker_id: &str) -> Option<&LocationFix> {
        self.trails.get(tracker_id)?.iter().max_by_key(|f| f.timestamp)
    }

    /// True when the tracker has no fix newer than the poll fallback interval,
    /// meaning the caller should fetch a fresh snapshot.
    pub fn is_stale(&self, tracker_id: &str, now: DateTime<Utc>, config: &AnalyticsConfig) -> bool {
        let window = Duration::seconds(config.poll_fallback_secs as i64);
        match self.latest_fix(tracker_id) {
            Some(latest) => now - latest.timestamp > window,
            None => true,
        }
    }

    /// Tracker ids in sorted order.
    pub fn tracker_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.trails.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn remove(&mut self, tracker_id: &str) -> Option<Vec<LocationFix>> {
        self.trails.remove(tracker_id)
    }

    /// Number of trackers.
    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    /// Number of fixes across every tracker.
    pub fn total_fixes(&self) -> usize {
        self.trails.values().map(Vec::len).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a store from JSON, validating every fix.
    pub fn from_json(json: &str) -> Result<Self> {
        let store: Self = serde_json::from_str(json)?;
        for (id, trail) in &store.trails {
            for fix in trail {
                fix.validate(id)?;
            }
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;

    fn fix(lat: f64, secs: i64) -> LocationFix {
        LocationFix::from_epoch_millis(lat, 0.0, 5.0, secs * 1000).unwrap()
    }

    #[test]
    fn test_record_appends() {
        let mut store = TrailStore::new();
        store.record_fix("a", fix(1.0, 0)).unwrap();
        store.record_fix("a", fix(2.0, 15)).unwrap();
        store.record_fix("b", fix(3.0, 0)).unwrap();

        assert_eq!(store.trail("a").unwrap().len(), 2);
        assert_eq!(store.trail("b").unwrap().len(), 1);
        assert_eq!(store.tracker_ids(), vec!["a", "b"]);
        assert_eq!(store.total_fixes(), 3);
        assert!(store.trail("c").is_none());
    }

    #[test]
    fn test_record_rejects_invalid() {
        let mut store = TrailStore::new();
        let err = store.record_fix("a", fix(95.0, 0)).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidCoordinates { .. }));
        assert!(store.is_empty());

        let result = store.record_fixes("a", vec![fix(1.0, 0), fix(-91.0, 1)]);
        assert!(result.is_err());
        assert!(store.trail("a").is_none());
    }

    #[test]
    fn test_replace_snapshot_last_write_wins() {
        let mut store = TrailStore::new();
        store.record_fixes("a", vec![fix(1.0, 0), fix(2.0, 15), fix(3.0, 30)]).unwrap();

        store.replace_snapshot("a", vec![fix(5.0, 45)]).unwrap();
        let trail = store.trail("a").unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].latitude, 5.0);

        // Invalid snapshot leaves the previous one in place
        assert!(store.replace_snapshot("a", vec![fix(100.0, 60)]).is_err());
        assert_eq!(store.trail("a").unwrap()[0].latitude, 5.0);
    }

    #[test]
    fn test_latest_and_sorted() {
        let mut store = TrailStore::new();
        store.record_fixes("a", vec![fix(1.0, 30), fix(2.0, 10), fix(3.0, 20)]).unwrap();

        assert_eq!(store.latest_fix("a").unwrap().latitude, 1.0);
        let lats: Vec<f64> = store.sorted_trail("a").iter().map(|f| f.latitude).collect();
        assert_eq!(lats, vec![2.0, 3.0, 1.0]);
        assert!(store.sorted_trail("missing").is_empty());
    }

    #[test]
    fn test_is_stale() {
        let config = AnalyticsConfig::default();
        let mut store = TrailStore::new();
        let now = DateTime::<Utc>::from_timestamp(100, 0).unwrap();

        assert!(store.is_stale("a", now, &config));
        store.record_fix("a", fix(1.0, 80)).unwrap();
        assert!(!store.is_stale("a", now, &config));
        store.replace_snapshot("a", vec![fix(1.0, 60)]).unwrap();
        assert!(store.is_stale("a", now, &config));
    }

    #[test]
    fn test_json_round_trip() {
        let mut store = TrailStore::new();
        store.record_fixes("a", vec![fix(1.0, 0), fix(2.0, 15)]).unwrap();

        let json = store.to_json().unwrap();
        let loaded = TrailStore::from_json(&json).unwrap();
        assert_eq!(loaded.trail("a"), store.trail("a"));

        let bad = r#"{"trails":{"x":[{"latitude":200.0,"longitude":0.0,"timestamp":"2024-01-01T00:00:00Z"}]}}"#;
        assert!(TrailStore::from_json(bad).is_err());
    }

    #[test]
    fn test_remove() {
        let mut store = TrailStore::new();
        store.record_fix("a", fix(1.0, 0)).unwrap();
        assert_eq!(store.remove("a").map(|t| t.len()), Some(1));
        assert!(store.is_empty());
    }
}
