//! Configuration for trail analytics and the components around it.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Configuration for dwell detection, reporting cadence and geocode caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Radius around a cluster's first fix within which later fixes count as
    /// the same stop.
    /// Default: 50.0 meters
    pub dwell_threshold_meters: f64,

    /// Minimum cluster duration for a dwell to be reported as a stop.
    /// Default: 300_000 ms (5 minutes)
    pub min_dwell_ms: i64,

    /// Cadence at which the tracking page reports fixes. Reports flag any
    /// pair of fixes more than twice this far apart as a reporting gap.
    /// Default: 15 seconds
    pub reporting_interval_secs: u64,

    /// How long the dashboard waits for a pushed update before polling for a
    /// full snapshot. Must be within 15..=30 seconds.
    /// Default: 30 seconds
    pub poll_fallback_secs: u64,

    /// Decimal places coordinates are rounded to when keying the geocode cache.
    /// 4 decimals is roughly 11 m at the equator.
    /// Default: 4
    pub geocode_precision: u32,

    /// Maximum number of cached reverse-geocoding results.
    /// Default: 500
    pub geocode_cache_capacity: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            dwell_threshold_meters: 50.0,
            min_dwell_ms: 5 * 60 * 1000,
            reporting_interval_secs: 15,
            poll_fallback_secs: 30,
            geocode_precision: 4,
            geocode_cache_capacity: 500,
        }
    }
}

impl AnalyticsConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        debug!("[Config] Loaded {:?}", config);
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.dwell_threshold_meters.is_finite() || self.dwell_threshold_meters < 0.0 {
            return Err(config_error(format!(
                "dwell_threshold_meters must be a non-negative number, got {}",
                self.dwell_threshold_meters
            )));
        }
        if self.min_dwell_ms < 0 {
            return Err(config_error(format!(
                "min_dwell_ms must be non-negative, got {}",
                self.min_dwell_ms
            )));
        }
        if self.reporting_interval_secs == 0 {
            return Err(config_error("reporting_interval_secs must be positive".to_string()));
        }
        if !(15..=30).contains(&self.poll_fallback_secs) {
            return Err(config_error(format!(
                "poll_fallback_secs must be between 15 and 30, got {}",
                self.poll_fallback_secs
            )));
        }
        if self.geocode_precision > 10 {
            return Err(config_error(format!(
                "geocode_precision must be at most 10, got {}",
                self.geocode_precision
            )));
        }
        if self.geocode_cache_capacity == 0 {
            return Err(config_error("geocode_cache_capacity must be positive".to_string()));
        }
        Ok(())
    }
}

fn config_error(message: String) -> TrackerError {
    TrackerError::Config { message }
}
