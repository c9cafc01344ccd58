//! Coordinates, great-circle distance, and normalized locales.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine distance to `other` in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

/// City and state, trimmed and lower-cased for comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    /// Normalized city, possibly empty.
    pub city: String,
    /// Normalized state, possibly empty.
    pub state: String,
}

impl Locale {
    /// Normalize a city/state pair.
    pub fn new(city: &str, state: &str) -> Self {
        Self {
            city: city.trim().to_lowercase(),
            state: state.trim().to_lowercase(),
        }
    }

    /// Whether both sides name the same non-empty city.
    pub fn same_city(&self, other: &Locale) -> bool {
        !self.city.is_empty() && self.city == other.city
    }

    /// Whether both sides name the same non-empty state.
    pub fn same_state(&self, other: &Locale) -> bool {
        !self.state.is_empty() && self.state == other.state
    }
}
