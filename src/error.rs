//! Unified error handling for the geotracker library.
//!
//! The analytics functions never fail: empty or degenerate trails produce
//! zero-valued results. Errors only come from the boundaries around them:
//! fix validation at ingestion, configuration loading, reverse geocoding and
//! JSON (de)serialisation.

use thiserror::Error;

/// Unified error type for geotracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Latitude or longitude is non-finite or outside its valid range
    #[error("fix for '{tracker_id}' has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        tracker_id: String,
        latitude: f64,
        longitude: f64,
    },
    /// Accuracy radius is negative or non-finite
    #[error("fix for '{tracker_id}' has invalid accuracy {accuracy}m")]
    InvalidAccuracy { tracker_id: String, accuracy: f64 },
    /// Timestamp could not be represented
    #[error("invalid timestamp: {message}")]
    InvalidTimestamp { message: String },
    /// Configuration error
    #[error("configuration error: {message}")]
    Config { message: String },
    /// Reverse geocoding collaborator failed
    #[error("geocoding failed for ({latitude}, {longitude}): {message}")]
    Geocoding {
        latitude: f64,
        longitude: f64,
        message: String,
    },
    /// JSON (de)serialisation error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for geotracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Extension trait for converting Option to TrackerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a configuration error.
    fn ok_or_config(self, message: &str) -> Result<T>;

    /// Convert Option to Result with an invalid timestamp error.
    fn ok_or_invalid_timestamp(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_config(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackerError::Config {
            message: message.to_string(),
        })
    }

    fn ok_or_invalid_timestamp(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackerError::InvalidTimestamp {
            message: message.to_string(),
        })
    }
}
