//! Coarse geolocation and great-circle distance.
//!
//! Warehouse selection only needs relative ordering between candidate
//! warehouses, not survey-grade accuracy, so the geolocator is a curated
//! city table with a substring fallback and country centroids. It never
//! fails; an unknown destination resolves to an approximate coordinate.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Earth radius used for great-circle math, in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinate pairs, in kilometers.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Curated city table. Keys are lowercase city names.
const CITY_TABLE: &[(&str, f64, f64)] = &[
    ("new york", 40.7128, -74.0060),
    ("los angeles", 34.0522, -118.2437),
    ("chicago", 41.8781, -87.6298),
    ("houston", 29.7604, -95.3698),
    ("phoenix", 33.4484, -112.0740),
    ("philadelphia", 39.9526, -75.1652),
    ("san antonio", 29.4241, -98.4936),
    ("san diego", 32.7157, -117.1611),
    ("dallas", 32.7767, -96.7970),
    ("san jose", 37.3382, -121.8863),
    ("austin", 30.2672, -97.7431),
    ("seattle", 47.6062, -122.3321),
    ("denver", 39.7392, -104.9903),
    ("boston", 42.3601, -71.0589),
    ("atlanta", 33.7490, -84.3880),
    ("miami", 25.7617, -80.1918),
    ("newark", 40.7357, -74.1724),
    ("memphis", 35.1495, -90.0490),
    ("portland", 45.5152, -122.6784),
    ("toronto", 43.6532, -79.3832),
    ("vancouver", 49.2827, -123.1207),
    ("london", 51.5074, -0.1278),
];

/// Country centroids for destinations outside the curated table.
/// Keys are ISO-3166 alpha-2 codes.
const COUNTRY_CENTROIDS: &[(&str, f64, f64)] = &[
    ("us", 39.8283, -98.5795),
    ("ca", 56.1304, -106.3468),
    ("gb", 55.3781, -3.4360),
    ("au", -25.2744, 133.7751),
    ("de", 51.1657, 10.4515),
    ("mx", 23.6345, -102.5528),
];

/// Fallback when even the country is unrecognized.
const DEFAULT_CENTROID: Coordinates = Coordinates {
    lat: 39.8283,
    lng: -98.5795,
};

/// Resolves (city, state, country) triples to approximate coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geolocator;

impl Geolocator {
    pub fn new() -> Self {
        Self
    }

    /// Resolves a destination to coordinates. Always returns a value:
    /// exact city match first, then case-insensitive substring match in
    /// either direction, then the country centroid, then a fixed default.
    pub fn locate(&self, city: &str, _state: &str, country: &str) -> Coordinates {
        let needle = city.trim().to_lowercase();

        if !needle.is_empty() {
            if let Some((_, lat, lng)) = CITY_TABLE.iter().find(|(name, _, _)| *name == needle) {
                return Coordinates::new(*lat, *lng);
            }

            if let Some((_, lat, lng)) = CITY_TABLE
                .iter()
                .find(|(name, _, _)| name.contains(&needle) || needle.contains(name))
            {
                return Coordinates::new(*lat, *lng);
            }
        }

        let country_code = country.trim().to_lowercase();
        if let Some((_, lat, lng)) = COUNTRY_CENTROIDS
            .iter()
            .find(|(code, _, _)| *code == country_code)
        {
            return Coordinates::new(*lat, *lng);
        }

        DEFAULT_CENTROID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // New York to Los Angeles is roughly 3936 km
        let nyc = Coordinates::new(40.7128, -74.0060);
        let la = Coordinates::new(34.0522, -118.2437);
        let d = haversine_km(nyc, la);
        assert!((d - 3936.0).abs() < 20.0, "got {d}");
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = Coordinates::new(41.8781, -87.6298);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = Coordinates::new(47.6062, -122.3321);
        let b = Coordinates::new(25.7617, -80.1918);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_exact_city_match() {
        let geo = Geolocator::new();
        let c = geo.locate("Chicago", "IL", "US");
        assert!((c.lat - 41.8781).abs() < 1e-6);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let geo = Geolocator::new();
        assert_eq!(geo.locate("SEATTLE", "WA", "US"), geo.locate("seattle", "WA", "US"));
    }

    #[test]
    fn test_substring_match_either_direction() {
        let geo = Geolocator::new();
        // Needle contained in a table entry
        let c = geo.locate("York", "NY", "US");
        assert!((c.lat - 40.7128).abs() < 1e-6);
        // Table entry contained in the needle
        let c = geo.locate("East Newark", "NJ", "US");
        assert!((c.lat - 40.7357).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_city_falls_back_to_country_centroid() {
        let geo = Geolocator::new();
        let c = geo.locate("Nowheresville", "??", "CA");
        assert!((c.lat - 56.1304).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_everything_falls_back_to_default() {
        let geo = Geolocator::new();
        let c = geo.locate("Nowheresville", "??", "ZZ");
        assert_eq!(c, DEFAULT_CENTROID);
    }

    #[test]
    fn test_empty_city_skips_substring_scan() {
        let geo = Geolocator::new();
        // An empty needle must not substring-match every table entry
        let c = geo.locate("", "", "US");
        assert_eq!(c, DEFAULT_CENTROID);
    }
}
