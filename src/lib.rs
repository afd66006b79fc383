//! # GeoTracker
//!
//! Analytics over GPS location trails reported by tracked devices.
//!
//! This library provides:
//! - Great-circle distance and per-segment speed between fixes
//! - Aggregate trail statistics (total distance, average/max speed, active time)
//! - Dwell-time clustering (where did the tracked party stop, and for how long)
//! - Hour-of-day and calendar-day bucketing for activity histograms
//! - Geofence containment, an injectable reverse-geocode cache and an
//!   append-only in-memory trail store feeding the analytics
//!
//! The analytics functions are pure: they read a snapshot of fixes and
//! allocate new results. They never sort, mutate or validate their input.
//!
//! ## Features
//!
//! - **`parallel`** - Build per-tracker reports in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use geotracker::{LocationFix, metrics};
//!
//! let trail = vec![
//!     LocationFix::from_epoch_millis(0.0, 0.0, 5.0, 0).unwrap(),
//!     LocationFix::from_epoch_millis(0.0, 0.009, 5.0, 1_000_000).unwrap(),
//! ];
//!
//! let distance = metrics::total_distance(&trail);
//! let speed = metrics::average_speed(&trail);
//! println!("{:.0}m at {:.1} km/h", distance, speed);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackerError};

// Configuration
pub mod config;
pub use config::AnalyticsConfig;

// Geographic utilities (distance, bearing, bounds, center)
pub mod geo_utils;

// Distance/speed primitives and aggregate trail statistics
pub mod metrics;
pub use metrics::{ReportingGap, Segment, TrailSummary};

// Dwell-time clustering
pub mod dwell;
pub use dwell::{dwell_times, DwellCluster};

// Hour-of-day and calendar-day bucketing
pub mod buckets;
pub use buckets::{by_calendar_day, by_hour_of_day};

// Circular geofences with R-tree lookup
pub mod geofence;
pub use geofence::{Geofence, GeofenceSet};

// Reverse geocoding with an explicitly passed LRU cache
pub mod geocode;
pub use geocode::{CachedGeocoder, CoordKey, GeocodeCache, ReverseGeocoder};

// Append-only in-memory trail store
pub mod store;
pub use store::TrailStore;

// Per-tracker reports
pub mod report;
pub use report::{build_report, build_reports, TrailReport};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use geotracker::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from fixes. `None` for an empty trail.
    pub fn from_fixes(fixes: &[LocationFix]) -> Option<Self> {
        let first = fixes.first()?;
        let mut bounds = Self {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lng: first.longitude,
            max_lng: first.longitude,
        };

        for f in &fixes[1..] {
            bounds.min_lat = bounds.min_lat.min(f.latitude);
            bounds.max_lat = bounds.max_lat.max(f.latitude);
            bounds.min_lng = bounds.min_lng.min(f.longitude);
            bounds.max_lng = bounds.max_lng.max(f.longitude);
        }

        Some(bounds)
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Device metadata collected by the tracking page. Never used in geometry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub browser: String,
    pub os: String,
    pub platform: String,
    pub screen: String,
}

/// One timestamped GPS observation.
///
/// Fixes are treated as immutable values: every analytics function borrows
/// them and none of them rewrites coordinates or timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    /// Degrees, expected in [-90, 90]
    pub latitude: f64,
    /// Degrees, expected in [-180, 180]
    pub longitude: f64,
    /// Estimated error radius in meters, display only
    #[serde(default)]
    pub accuracy: f64,
    /// Absolute time of the observation (RFC 3339 on the wire)
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl LocationFix {
    /// Create a fix without device metadata.
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp,
            device_info: None,
            ip: None,
        }
    }

    /// Create a fix from a Unix timestamp in milliseconds.
    ///
    /// Fails only when the timestamp is outside chrono's representable range.
    pub fn from_epoch_millis(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        epoch_ms: i64,
    ) -> Result<Self> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(epoch_ms)
            .ok_or_invalid_timestamp(&format!("{} ms is out of range", epoch_ms))?;
        Ok(Self::new(latitude, longitude, accuracy, timestamp))
    }

    pub fn with_device_info(mut self, device_info: DeviceInfo) -> Self {
        self.device_info = Some(device_info);
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Unix timestamp in milliseconds.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Coordinates of this fix.
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// Validate coordinates and accuracy.
    ///
    /// Intended for the ingestion boundary; analytics never calls this and
    /// never clamps out-of-range values.
    pub fn validate(&self, tracker_id: &str) -> Result<()> {
        if !self.point().is_valid() {
            return Err(TrackerError::InvalidCoordinates {
                tracker_id: tracker_id.to_string(),
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        if !self.accuracy.is_finite() || self.accuracy < 0.0 {
            return Err(TrackerError::InvalidAccuracy {
                tracker_id: tracker_id.to_string(),
                accuracy: self.accuracy,
            });
        }
        Ok(())
    }
}

/// Sort a trail in place by ascending timestamp. Stable for equal timestamps.
pub fn sort_by_timestamp(fixes: &mut [LocationFix]) {
    fixes.sort_by_key(|f| f.timestamp);
}

/// Return a copy of the trail sorted by ascending timestamp.
pub fn sorted_by_timestamp(fixes: &[LocationFix]) -> Vec<LocationFix> {
    let mut sorted = fixes.to_vec();
    sort_by_timestamp(&mut sorted);
    sorted
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_at(lat: f64, lon: f64, ms: i64) -> LocationFix {
        LocationFix::from_epoch_millis(lat, lon, 10.0, ms).unwrap()
    }

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_fix_validation() {
        assert!(fix_at(45.0, 7.0, 0).validate("t").is_ok());
        assert!(matches!(
            fix_at(-95.0, 7.0, 0).validate("t"),
            Err(TrackerError::InvalidCoordinates { .. })
        ));

        let mut bad_accuracy = fix_at(45.0, 7.0, 0);
        bad_accuracy.accuracy = -1.0;
        assert!(matches!(
            bad_accuracy.validate("t"),
            Err(TrackerError::InvalidAccuracy { .. })
        ));
    }

    #[test]
    fn test_from_epoch_millis() {
        let fix = fix_at(1.0, 2.0, 1_700_000_000_123);
        assert_eq!(fix.timestamp_millis(), 1_700_000_000_123);
        assert!(LocationFix::from_epoch_millis(0.0, 0.0, 0.0, i64::MAX).is_err());
    }

    #[test]
    fn test_sort_by_timestamp() {
        let trail = vec![fix_at(0.0, 0.0, 3000), fix_at(1.0, 0.0, 1000), fix_at(2.0, 0.0, 2000)];
        let sorted = sorted_by_timestamp(&trail);
        let times: Vec<i64> = sorted.iter().map(|f| f.timestamp_millis()).collect();
        assert_eq!(times, vec![1000, 2000, 3000]);
        // Input untouched
        assert_eq!(trail[0].timestamp_millis(), 3000);
    }

    #[test]
    fn test_bounds_from_fixes() {
        assert!(Bounds::from_fixes(&[]).is_none());

        let trail = vec![fix_at(51.50, -0.13, 0), fix_at(51.51, -0.12, 1), fix_at(51.505, -0.125, 2)];
        let bounds = Bounds::from_fixes(&trail).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
    }

    #[test]
    fn test_fix_json_round_trip_keeps_metadata() {
        let json = r#"{
            "latitude": 40.4168,
            "longitude": -3.7038,
            "accuracy": 12.5,
            "timestamp": "2024-05-01T10:15:30.250Z",
            "deviceInfo": {"browser": "Firefox", "os": "Linux", "platform": "x86_64", "screen": "1920x1080"},
            "ip": "203.0.113.7"
        }"#;
        let fix: LocationFix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.timestamp_millis() % 1000, 250);
        assert_eq!(fix.device_info.as_ref().unwrap().browser, "Firefox");
        assert_eq!(fix.ip.as_deref(), Some("203.0.113.7"));

        let back = serde_json::to_string(&fix).unwrap();
        assert!(back.contains("deviceInfo"));
        let again: LocationFix = serde_json::from_str(&back).unwrap();
        assert_eq!(again, fix);
    }
}
