//! Reverse geocoding with an explicitly owned LRU cache.
//!
//! The geocoding service is an external collaborator behind the
//! [`ReverseGeocoder`] trait. Results are cached per [`CoordKey`], i.e. per
//! coordinate rounded to a fixed number of decimals, so fixes reported a few
//! meters apart share one lookup. The cache is a plain value handed to
//! [`CachedGeocoder`]; each test can build a fresh one.

use std::num::NonZeroUsize;

use log::{debug, warn};
use lru::LruCache;

use crate::config::AnalyticsConfig;
use crate::error::{OptionExt, Result};

/// Coordinates rounded to `precision` decimal places, usable as a hash key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    lat: i64,
    lon: i64,
    precision: u32,
}

impl CoordKey {
    pub fn new(latitude: f64, longitude: f64, precision: u32) -> Self {
        let scale = 10f64.powi(precision as i32);
        Self {
            lat: (latitude * scale).round() as i64,
            lon: (longitude * scale).round() as i64,
            precision,
        }
    }

    /// Rounded latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.lat as f64 / 10f64.powi(self.precision as i32)
    }

    /// Rounded longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.lon as f64 / 10f64.powi(self.precision as i32)
    }
}

/// Turns a coordinate into a human-readable address.
pub trait ReverseGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<String>;
}

impl<F> ReverseGeocoder for F
where
    F: Fn(f64, f64) -> Result<String>,
{
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<String> {
        self(latitude, longitude)
    }
}

/// Bounded address cache with least-recently-used eviction.
#[derive(Debug)]
pub struct GeocodeCache {
    entries: LruCache<CoordKey, String>,
    precision: u32,
    hits: u64,
    misses: u64,
}

impl GeocodeCache {
    /// Create a cache holding at most `capacity` addresses.
    pub fn new(capacity: usize, precision: u32) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_config("geocode cache capacity must be positive")?;
        Ok(Self {
            entries: LruCache::new(capacity),
            precision,
            hits: 0,
            misses: 0,
        })
    }

    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        Self::new(config.geocode_cache_capacity, config.geocode_precision)
    }

    pub fn key(&self, latitude: f64, longitude: f64) -> CoordKey {
        CoordKey::new(latitude, longitude, self.precision)
    }

    /// Look up an address, marking it as recently used.
    pub fn get(&mut self, latitude: f64, longitude: f64) -> Option<&String> {
        let key = self.key(latitude, longitude);
        match self.entries.get(&key) {
            Some(address) => {
                self.hits += 1;
                Some(address)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, latitude: f64, longitude: f64, address: String) {
        let key = self.key(latitude, longitude);
        if let Some((evicted, _)) = self.entries.push(key, address) {
            if evicted != key {
                debug!(
                    "[Geocode] Evicted ({}, {})",
                    evicted.latitude(),
                    evicted.longitude()
                );
            }
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.entries.contains(&self.key(latitude, longitude))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// A geocoder that consults its cache before calling the collaborator.
///
/// Failed lookups are not cached, so a transient outage is retried on the
/// next call.
pub struct CachedGeocoder<G> {
    geocoder: G,
    cache: GeocodeCache,
}

impl<G: ReverseGeocoder> CachedGeocoder<G> {
    pub fn new(geocoder: G, cache: GeocodeCache) -> Self {
        Self { geocoder, cache }
    }

    pub fn reverse(&mut self, latitude: f64, longitude: f64) -> Result<String> {
        if let Some(address) = self.cache.get(latitude, longitude) {
            return Ok(address.clone());
        }

        match self.geocoder.reverse(latitude, longitude) {
            Ok(address) => {
                self.cache.insert(latitude, longitude, address.clone());
                Ok(address)
            }
            Err(e) => {
                warn!("[Geocode] Lookup failed for ({}, {}): {}", latitude, longitude, e);
                Err(e)
            }
        }
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    pub fn into_parts(self) -> (G, GeocodeCache) {
        (self.geocoder, self.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use std::cell::Cell;

    struct CountingGeocoder {
        calls: Cell<u32>,
    }

    impl ReverseGeocoder for CountingGeocoder {
        fn reverse(&self, latitude: f64, longitude: f64) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(format!("{:.4},{:.4}", latitude, longitude))
        }
    }

    #[test]
    fn test_coord_key_rounding() {
        let a = CoordKey::new(40.416_81, -3.703_79, 4);
        let b = CoordKey::new(40.416_79, -3.703_81, 4);
        let c = CoordKey::new(40.417_2, -3.703_8, 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!((a.latitude() - 40.4168).abs() < 1e-9);
        assert!((a.longitude() - -3.7038).abs() < 1e-9);
    }

    #[test]
    fn test_cache_rejects_zero_capacity() {
        assert!(matches!(GeocodeCache::new(0, 4), Err(TrackerError::Config { .. })));
    }

    #[test]
    fn test_cache_eviction() {
        let mut cache = GeocodeCache::new(2, 3).unwrap();
        cache.insert(1.0, 1.0, "a".to_string());
        cache.insert(2.0, 2.0, "b".to_string());

        // Touch "a" so "b" is least recently used
        assert_eq!(cache.get(1.0, 1.0).map(String::as_str), Some("a"));
        cache.insert(3.0, 3.0, "c".to_string());

        assert!(cache.contains(1.0, 1.0));
        assert!(!cache.contains(2.0, 2.0));
        assert!(cache.contains(3.0, 3.0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cached_geocoder_hits_cache() {
        let geocoder = CountingGeocoder { calls: Cell::new(0) };
        let mut cached = CachedGeocoder::new(geocoder, GeocodeCache::new(10, 4).unwrap());

        let first = cached.reverse(48.858_37, 2.294_48).unwrap();
        // Within rounding distance of the first lookup
        let second = cached.reverse(48.858_41, 2.294_52).unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.cache().hits(), 1);
        assert_eq!(cached.cache().misses(), 1);

        let (geocoder, cache) = cached.into_parts();
        assert_eq!(geocoder.calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let failing = |lat: f64, lon: f64| -> Result<String> {
            Err(TrackerError::Geocoding {
                latitude: lat,
                longitude: lon,
                message: "service unavailable".to_string(),
            })
        };
        let mut cached = CachedGeocoder::new(failing, GeocodeCache::new(10, 4).unwrap());
        assert!(cached.reverse(1.0, 1.0).is_err());
        assert!(cached.cache().is_empty());
    }

    #[test]
    fn test_fresh_cache_per_geocoder() {
        let config = AnalyticsConfig::default();
        let mut a = CachedGeocoder::new(
            |_: f64, _: f64| -> Result<String> { Ok("A".to_string()) },
            GeocodeCache::from_config(&config).unwrap(),
        );
        let mut b = CachedGeocoder::new(
            |_: f64, _: f64| -> Result<String> { Ok("B".to_string()) },
            GeocodeCache::from_config(&config).unwrap(),
        );
        assert_eq!(a.reverse(0.0, 0.0).unwrap(), "A");
        assert_eq!(b.reverse(0.0, 0.0).unwrap(), "B");
    }
}
