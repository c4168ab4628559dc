use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reject coordinates that cannot be a position on Earth
    pub fn validate(self) -> AppResult<Self> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::InvalidCoordinates(format!(
                "Latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::InvalidCoordinates(format!(
                "Longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(self)
    }
}

/// A named location's allowed clock-in perimeter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeofenceZone {
    pub id: String,
    pub name: String,
    pub center: GeoPoint,
    pub radius_meters: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceResult {
    pub is_within: bool,
    pub distance_meters: i64,
}

/// Calculate distance between two coordinates using Haversine formula
/// Returns distance in whole meters
pub fn distance(a: GeoPoint, b: GeoPoint) -> i64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    (EARTH_RADIUS_M * c).round() as i64
}

/// Check if a user is within a zone. The radius edge counts as inside.
pub fn evaluate(user_point: GeoPoint, zone: &GeofenceZone) -> GeofenceResult {
    let distance_meters = distance(user_point, zone.center);
    GeofenceResult {
        is_within: distance_meters <= i64::from(zone.radius_meters),
        distance_meters,
    }
}

/// Render a distance for user-facing messages, e.g. `650m` or `1.1km`
pub fn format_distance(meters: i64) -> String {
    if meters < 1000 {
        format!("{}m", meters)
    } else {
        // Half-up to the nearest 100m, so 1250m reads 1.3km
        let tenths = (meters + 50) / 100;
        format!("{}.{}km", tenths / 10, tenths % 10)
    }
}
