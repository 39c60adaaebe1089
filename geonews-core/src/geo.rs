//! Great-circle distance and radius filtering
//!
//! Haversine distance on a sphere of radius 6371 km:
//!
//!   a = sin²(Δφ/2) + cos φ1 × cos φ2 × sin²(Δλ/2)
//!   d = 2R × atan2(√a, √(1−a))
//!
//! The geo-filter is a linear scan: every candidate is distance-tested against
//! the origin. A spatial index would slot in behind `within_radius` without
//! changing its contract.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude in [-90, 90], longitude in [-180, 180].
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} outside [-90, 90]", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} outside [-180, 180]", self.longitude));
        }
        Ok(())
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Anything that carries a coordinate.
pub trait Located {
    fn location(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn location(&self) -> GeoPoint {
        *self
    }
}

/// Haversine distance in kilometers between two (lat, lon) pairs in degrees.
///
/// Out-of-range inputs still produce a number; range checks live at the boundary.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);

    // a can drift a hair outside [0, 1] for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Candidates within `radius_km` of `origin`, paired with their distance.
/// Input order is preserved.
pub fn within_radius<T, I>(origin: GeoPoint, radius_km: f64, candidates: I) -> Vec<(T, f64)>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = origin.distance_km(&candidate.location());
            (distance <= radius_km).then_some((candidate, distance))
        })
        .collect()
}

/// Like `within_radius`, nearest first.
pub fn nearest_within<T, I>(origin: GeoPoint, radius_km: f64, candidates: I) -> Vec<(T, f64)>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let mut hits = within_radius(origin, radius_km, candidates);
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

/// Rectangular lat/lon window. No wraparound handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, degrees: f64) -> Self {
        Self {
            min_latitude: center.latitude - degrees,
            max_latitude: center.latitude + degrees,
            min_longitude: center.longitude - degrees,
            max_longitude: center.longitude + degrees,
        }
    }

    /// Smallest window holding every point within `radius_km` of `center`.
    ///
    /// `None` when the circle reaches a pole or crosses the antimeridian; no
    /// single rectangle covers those, so callers fall back to an unbounded scan.
    pub fn covering(center: GeoPoint, radius_km: f64) -> Option<Self> {
        if !radius_km.is_finite() || radius_km < 0.0 {
            return None;
        }

        // padded so points exactly on the circle survive float rounding
        let angular = radius_km / EARTH_RADIUS_KM * (1.0 + 1e-9);
        let lat = center.latitude.to_radians();
        let lon = center.longitude.to_radians();

        let (min_lat, max_lat) = (lat - angular, lat + angular);
        if min_lat <= -FRAC_PI_2 || max_lat >= FRAC_PI_2 {
            return None;
        }

        // widest longitude offset of a spherical cap, reached off the center parallel
        let dlon = (angular.sin() / lat.cos()).asin();
        let (min_lon, max_lon) = (lon - dlon, lon + dlon);
        if min_lon < -PI || max_lon > PI {
            return None;
        }

        Some(Self {
            min_latitude: min_lat.to_degrees(),
            max_latitude: max_lat.to_degrees(),
            min_longitude: min_lon.to_degrees(),
            max_longitude: max_lon.to_degrees(),
        })
    }
}
