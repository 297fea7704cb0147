//! Spatial geometry types used by spatial query constraints

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, for great-circle distances.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geographic point (latitude/longitude in degrees)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
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

    /// Great-circle distance to another point, in meters (haversine).
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }
}

/// Axis-aligned geographic bounding box
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn new(min_latitude: f64, min_longitude: f64, max_latitude: f64, max_longitude: f64) -> Self {
        Self {
            min_latitude,
            min_longitude,
            max_latitude,
            max_longitude,
        }
    }

    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            min_latitude: point.latitude,
            min_longitude: point.longitude,
            max_latitude: point.latitude,
            max_longitude: point.longitude,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_latitude
            && point.latitude <= self.max_latitude
            && point.longitude >= self.min_longitude
            && point.longitude <= self.max_longitude
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_latitude < other.min_latitude
            || self.min_latitude > other.max_latitude
            || self.max_longitude < other.min_longitude
            || self.min_longitude > other.max_longitude)
    }

    pub fn expand(&mut self, point: &GeoPoint) {
        self.min_latitude = self.min_latitude.min(point.latitude);
        self.min_longitude = self.min_longitude.min(point.longitude);
        self.max_latitude = self.max_latitude.max(point.latitude);
        self.max_longitude = self.max_longitude.max(point.longitude);
    }
}

/// Point-in-polygon test by ray casting. The polygon is a closed ring of
/// vertices; the closing edge from last to first is implied.
pub fn polygon_contains(points: &[GeoPoint], candidate: &GeoPoint) -> bool {
    if points.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let pi = &points[i];
        let pj = &points[j];
        let crosses = (pi.longitude > candidate.longitude) != (pj.longitude > candidate.longitude);
        if crosses {
            let slope = (pj.latitude - pi.latitude) / (pj.longitude - pi.longitude);
            let intercept = pi.latitude + (candidate.longitude - pi.longitude) * slope;
            if candidate.latitude < intercept {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Bounding box enclosing a polygon ring.
pub fn polygon_bounds(points: &[GeoPoint]) -> Option<BoundingBox> {
    let first = points.first()?;
    let mut bounds = BoundingBox::from_point(*first);
    for point in &points[1..] {
        bounds.expand(point);
    }
    Some(bounds)
}
