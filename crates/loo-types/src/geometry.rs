//! Geometry for loo locations.
//!
//! Stored geometry is a GeoJSON `Point` whose coordinates are always in
//! `[longitude, latitude]` order. Callers speak [`Location`]; the two
//! `From` conversions below are the only places the order is decided.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Mean Earth radius in metres (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Caller-facing position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that both components are finite and within WGS84 bounds.
    pub fn validate(&self) -> Result<(), TypeError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(TypeError::LatitudeOutOfRange(self.lat.to_string()));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(TypeError::LongitudeOutOfRange(self.lng.to_string()));
        }
        Ok(())
    }

    /// Great-circle distance in metres (haversine).
    pub fn distance_m(&self, other: &Location) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
}

/// Stored GeoJSON point. `coordinates` is `[lng, lat]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub coordinates: [f64; 2],
}

impl Point {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            kind: GeometryKind::Point,
            coordinates: [lng, lat],
        }
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

impl From<Location> for Point {
    fn from(location: Location) -> Self {
        Point::new(location.lng, location.lat)
    }
}

impl From<Point> for Location {
    fn from(point: Point) -> Self {
        Location::new(point.lat(), point.lng())
    }
}
