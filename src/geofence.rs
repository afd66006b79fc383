//! Circular geofences and a spatial index for "which fences contain this fix".
//!
//! Only containment is evaluated here. Tracking entered/exited state across a
//! stream of fixes is left to the caller.

use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::geo_utils::{meters_to_degrees, point_distance};
use crate::{GpsPoint, LocationFix};

/// A named circular region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub name: String,
    pub center: GpsPoint,
    pub radius_meters: f64,
}

impl Geofence {
    /// Create a geofence, rejecting invalid centers and negative radii.
    pub fn new(name: impl Into<String>, center: GpsPoint, radius_meters: f64) -> Result<Self> {
        let name = name.into();
        if !center.is_valid() {
            return Err(TrackerError::InvalidCoordinates {
                tracker_id: name,
                latitude: center.latitude,
                longitude: center.longitude,
            });
        }
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            return Err(TrackerError::Config {
                message: format!("geofence '{}' radius must be non-negative, got {}", name, radius_meters),
            });
        }
        Ok(Self {
            name,
            center,
            radius_meters,
        })
    }

    /// True when the fix lies on or inside the circle.
    pub fn contains(&self, fix: &LocationFix) -> bool {
        self.distance_to_boundary(fix) <= 0.0
    }

    /// Signed distance in meters from the fence edge: negative inside, positive outside.
    pub fn distance_to_boundary(&self, fix: &LocationFix) -> f64 {
        point_distance(&self.center, &fix.point()) - self.radius_meters
    }

    /// Lng/lat envelope enclosing the whole circle.
    ///
    /// The widest longitude of a spherical cap of angular radius `d` centred
    /// at latitude `lat` is `asin(sin d / cos lat)`. Circles reaching a pole
    /// or the antimeridian get the full longitude range.
    fn envelope(&self) -> AABB<[f64; 2]> {
        let lat = self.center.latitude;
        let lng = self.center.longitude;
        let dlat = widen(meters_to_degrees(self.radius_meters));
        let (min_lat, max_lat) = (lat - dlat, lat + dlat);

        let full_width = || {
            AABB::from_corners([-180.0, min_lat.max(-90.0)], [180.0, max_lat.min(90.0)])
        };
        if min_lat <= -90.0 || max_lat >= 90.0 {
            return full_width();
        }

        let ratio = dlat.to_radians().sin() / lat.to_radians().cos();
        if ratio >= 1.0 {
            return full_width();
        }
        let dlng = widen(ratio.asin().to_degrees());
        if lng - dlng < -180.0 || lng + dlng > 180.0 {
            return full_width();
        }

        AABB::from_corners([lng - dlng, min_lat], [lng + dlng, max_lat])
    }
}

/// Pad an angle so rounding in the distance formula cannot leave an edge fix
/// outside the envelope.
fn widen(degrees: f64) -> f64 {
    degrees * (1.0 + 1e-9) + 1e-9
}

/// Envelope entry pointing back into [`GeofenceSet::fences`].
#[derive(Debug, Clone)]
struct FenceBounds {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for FenceBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// A fixed collection of geofences indexed by an R-tree.
///
/// [`GeofenceSet::containing`] agrees with [`Geofence::contains`] everywhere,
/// including near the poles and across the antimeridian.
#[derive(Debug)]
pub struct GeofenceSet {
    fences: Vec<Geofence>,
    index: RTree<FenceBounds>,
}

impl GeofenceSet {
    pub fn new(fences: Vec<Geofence>) -> Self {
        let bounds = fences
            .iter()
            .enumerate()
            .map(|(index, fence)| FenceBounds {
                index,
                envelope: fence.envelope(),
            })
            .collect();

        Self {
            index: RTree::bulk_load(bounds),
            fences,
        }
    }

    /// Fences containing the fix, in insertion order.
    pub fn containing(&self, fix: &LocationFix) -> Vec<&Geofence> {
        let query = AABB::from_point([fix.longitude, fix.latitude]);
        let mut hits: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&query)
            .map(|b| b.index)
            .filter(|&i| self.fences[i].contains(fix))
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|i| &self.fences[i]).collect()
    }

    pub fn fences(&self) -> &[Geofence] {
        &self.fences
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}
