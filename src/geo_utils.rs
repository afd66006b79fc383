//! # Geographic Utilities
//!
//! Core geographic computations used throughout the trail analytics.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two coordinate pairs |
//! | [`fix_distance`] | Distance between two fixes |
//! | [`point_distance`] | Distance between two [`GpsPoint`]s |
//! | [`bearing`] | Initial bearing between two points |
//! | [`compute_center`] | Arithmetic centroid of a trail |
//! | [`meters_to_degrees`] | Great-circle arc length in meters as degrees of arc |
//!
//! ## Haversine Formula
//!
//! The haversine formula computes the great-circle distance between two points
//! on a sphere. Distances here use a spherical Earth of radius exactly
//! 6,371,000 m so that results are reproducible across platforms and match
//! the dashboard's historical numbers.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)

use geo::{Bearing, Haversine, Point};

use crate::{GpsPoint, LocationFix};

/// Earth radius used by every distance computation in this crate.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in meters between two latitude/longitude pairs in degrees.
///
/// Returns 0 for identical coordinates. Symmetric in its two points and
/// finite for any finite input, including antipodal and near-pole pairs.
///
/// # Example
///
/// ```rust
/// use geotracker::geo_utils::haversine_distance;
///
/// // London to Paris is roughly 344 km
/// let d = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
/// assert!((d - 343_500.0).abs() < 1_000.0);
/// ```
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points
    let a = a.min(1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Distance in meters between two fixes.
#[inline]
pub fn fix_distance(a: &LocationFix, b: &LocationFix) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Distance in meters between two points.
#[inline]
pub fn point_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Initial great-circle bearing from `a` to `b` in degrees, 0 = north, clockwise,
/// normalised to [0, 360).
pub fn bearing(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let origin = Point::new(a.longitude, a.latitude);
    let destination = Point::new(b.longitude, b.latitude);
    Haversine::bearing(origin, destination).rem_euclid(360.0)
}

/// Degrees of great-circle arc spanned by `meters` on the same sphere
/// [`haversine_distance`] measures on.
///
/// Along a meridian this is exactly the latitude difference. Longitude
/// spans are wider away from the equator and are derived by the caller.
#[inline]
pub fn meters_to_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_METERS).to_degrees()
}

// =============================================================================
// Center/Centroid Functions
// =============================================================================

/// Arithmetic mean of all fix coordinates. `None` for an empty trail.
///
/// Suitable for the small areas a single tracked party covers; trails that
/// cross the antimeridian will average to the wrong side of the globe.
pub fn compute_center(fixes: &[LocationFix]) -> Option<GpsPoint> {
    if fixes.is_empty() {
        return None;
    }

    let sum_lat: f64 = fixes.iter().map(|f| f.latitude).sum();
    let sum_lng: f64 = fixes.iter().map(|f| f.longitude).sum();
    let n = fixes.len() as f64;

    Some(GpsPoint::new(sum_lat / n, sum_lng / n))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Destination;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        assert_eq!(haversine_distance(51.5074, -0.1278, 51.5074, -0.1278), 0.0);
        assert_eq!(haversine_distance(-89.9, 179.9, -89.9, 179.9), 0.0);
    }

    #[test]
    fn test_haversine_distance_symmetric() {
        let ab = haversine_distance(40.4168, -3.7038, 41.3874, 2.1686);
        let ba = haversine_distance(41.3874, 2.1686, 40.4168, -3.7038);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_haversine_distance_known_value() {
        let dist = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
        assert!(approx_eq(dist, 343_500.0, 5_000.0));
    }

    #[test]
    fn test_one_kilometre_along_meridian() {
        // 1 km north expressed in degrees of latitude on a 6,371 km sphere
        let dlat = (1000.0 / EARTH_RADIUS_METERS).to_degrees();
        let dist = haversine_distance(45.0, 7.0, 45.0 + dlat, 7.0);
        assert!(approx_eq(dist, 1000.0, 0.01));
    }

    #[test]
    fn test_small_scale_is_nearly_planar() {
        // Right angle at the origin: 300 m north and 400 m east
        let origin = Point::new(7.0, 45.0);
        let north = Haversine::destination(origin, 0.0, 300.0);
        let east = Haversine::destination(origin, 90.0, 400.0);
        let hyp = haversine_distance(north.y(), north.x(), east.y(), east.x());
        assert!(approx_eq(hyp, 500.0, 1.0));
    }

    #[test]
    fn test_antipodal_and_poles_are_finite() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_METERS;
        let antipodal = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!(antipodal.is_finite());
        assert!(approx_eq(antipodal, half_circumference, 1.0));

        let pole_to_pole = haversine_distance(90.0, 0.0, -90.0, 0.0);
        assert!(approx_eq(pole_to_pole, half_circumference, 1.0));

        let near_pole = haversine_distance(89.9999, 0.0, 89.9999, 180.0);
        assert!(near_pole.is_finite() && near_pole > 0.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GpsPoint::new(0.0, 0.0);
        assert!(approx_eq(bearing(&origin, &GpsPoint::new(1.0, 0.0)), 0.0, 0.01));
        assert!(approx_eq(bearing(&origin, &GpsPoint::new(0.0, 1.0)), 90.0, 0.01));
        assert!(approx_eq(bearing(&origin, &GpsPoint::new(-1.0, 0.0)), 180.0, 0.01));
        assert!(approx_eq(bearing(&origin, &GpsPoint::new(0.0, -1.0)), 270.0, 0.01));
    }

    #[test]
    fn test_compute_center() {
        let trail = vec![
            LocationFix::from_epoch_millis(51.50, -0.10, 5.0, 0).unwrap(),
            LocationFix::from_epoch_millis(51.52, -0.12, 5.0, 1).unwrap(),
        ];
        let center = compute_center(&trail).unwrap();
        assert!(approx_eq(center.latitude, 51.51, 0.001));
        assert!(approx_eq(center.longitude, -0.11, 0.001));
        assert!(compute_center(&[]).is_none());
    }

    #[test]
    fn test_meters_to_degrees() {
        // One degree of arc on a 6,371 km sphere is about 111,195 m
        let one_degree = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
        assert!(approx_eq(meters_to_degrees(one_degree), 1.0, 1e-12));
        assert!(approx_eq(one_degree, 111_194.9, 0.1));

        // Inverse of the meridian distance
        let dlat = meters_to_degrees(999.0);
        assert!(approx_eq(haversine_distance(0.0, 0.0, dlat, 0.0), 999.0, 1e-6));
    }
}
