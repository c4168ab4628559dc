//! Clock-in validation gate.
//!
//! Resolves the target zone through a [`ZoneDirectory`], checks the worker's
//! reported position against it, and returns a [`ClockInOutcome`]. Nothing
//! here writes to storage; the caller records the shift on `Accepted`.

use std::fmt;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::Deserialize;
use serde_json::Value;

use crate::config::DefaultLocation;
use crate::entities::location;
use crate::error::{AppError, AppResult};
use crate::utils::geo::{evaluate, format_distance, GeoPoint, GeofenceZone};

/// Body of a clock-in request.
///
/// Every field is kept as raw JSON so that a wrongly typed value reaches the
/// validation flow instead of failing deserialization as a generic 422.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInRequest {
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
    #[serde(default)]
    pub location_id: Option<Value>,
    #[serde(default)]
    pub notes: Option<Value>,
}

impl ClockInRequest {
    /// Requested location, `None` when absent, null or blank.
    /// A non-string id is looked up by its JSON text and normally matches nothing.
    pub fn location_id(&self) -> Option<String> {
        let id = match self.location_id.as_ref()? {
            Value::Null => return None,
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        (!id.is_empty()).then_some(id)
    }

    /// Free-text note; anything but a string is dropped
    pub fn notes(&self) -> Option<String> {
        self.notes.as_ref().and_then(Value::as_str).map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneQuery {
    ById(String),
    Default(DefaultLocation),
}

/// Read access to geofence zones
#[async_trait]
pub trait ZoneDirectory: Send + Sync {
    async fn find_zone(&self, query: &ZoneQuery) -> AppResult<Option<GeofenceZone>>;
}

#[async_trait]
impl ZoneDirectory for DatabaseConnection {
    async fn find_zone(&self, query: &ZoneQuery) -> AppResult<Option<GeofenceZone>> {
        let found = match query {
            ZoneQuery::ById(id) | ZoneQuery::Default(DefaultLocation::Id(id)) => {
                location::Entity::find_by_id(id.clone()).one(self).await?
            }
            ZoneQuery::Default(DefaultLocation::First) => {
                location::Entity::find()
                    .order_by_asc(location::Column::CreatedAt)
                    .order_by_asc(location::Column::Id)
                    .one(self)
                    .await?
            }
            ZoneQuery::Default(DefaultLocation::None) => None,
        };

        Ok(found.map(GeofenceZone::from))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceViolation {
    pub distance_meters: i64,
    pub max_distance_meters: i32,
    pub location_name: String,
    pub message: String,
}

impl fmt::Display for GeofenceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl GeofenceViolation {
    fn new(zone: &GeofenceZone, distance_meters: i64) -> Self {
        let message = format!(
            "You are too far from the location to clock in. You are {} away, but must be within {} of {}.",
            format_distance(distance_meters),
            format_distance(i64::from(zone.radius_meters)),
            zone.name
        );
        Self {
            distance_meters,
            max_distance_meters: zone.radius_meters,
            location_name: zone.name.clone(),
            message,
        }
    }
}

/// A clock-in that passed the geofence. `point` is what the worker sent.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedClockIn {
    pub point: GeoPoint,
    pub zone: GeofenceZone,
    pub distance_meters: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClockInOutcome {
    Accepted(AcceptedClockIn),
    RejectedMissingCoordinates,
    RejectedInvalidCoordinates(String),
    RejectedNoZone,
    RejectedGeofenceViolation(GeofenceViolation),
}

impl ClockInOutcome {
    /// Collapse rejections into the matching `AppError` for the HTTP layer
    pub fn into_result(self) -> AppResult<AcceptedClockIn> {
        match self {
            ClockInOutcome::Accepted(accepted) => Ok(accepted),
            ClockInOutcome::RejectedMissingCoordinates => Err(AppError::MissingCoordinates),
            ClockInOutcome::RejectedInvalidCoordinates(reason) => {
                Err(AppError::InvalidCoordinates(reason))
            }
            ClockInOutcome::RejectedNoZone => Err(AppError::NoZoneAvailable),
            ClockInOutcome::RejectedGeofenceViolation(violation) => {
                Err(AppError::GeofenceViolation(violation))
            }
        }
    }
}

/// Pull a numeric coordinate out of the request, `None` if absent or not a number
fn coordinate(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

pub async fn validate_clock_in<D>(
    zones: &D,
    default_location: &DefaultLocation,
    request: &ClockInRequest,
) -> AppResult<ClockInOutcome>
where
    D: ZoneDirectory + ?Sized,
{
    let (Some(latitude), Some(longitude)) = (
        coordinate(request.latitude.as_ref()),
        coordinate(request.longitude.as_ref()),
    ) else {
        return Ok(ClockInOutcome::RejectedMissingCoordinates);
    };

    let point = match GeoPoint::new(latitude, longitude).validate() {
        Ok(point) => point,
        Err(AppError::InvalidCoordinates(reason)) => {
            return Ok(ClockInOutcome::RejectedInvalidCoordinates(reason));
        }
        Err(e) => return Err(e),
    };

    let query = match request.location_id() {
        Some(id) => ZoneQuery::ById(id),
        None => ZoneQuery::Default(default_location.clone()),
    };

    let Some(zone) = zones.find_zone(&query).await? else {
        tracing::debug!(?query, "No zone resolved for clock-in");
        return Ok(ClockInOutcome::RejectedNoZone);
    };

    let result = evaluate(point, &zone);
    if !result.is_within {
        tracing::info!(
            zone = %zone.id,
            distance = result.distance_meters,
            radius = zone.radius_meters,
            "Clock-in rejected outside geofence"
        );
        return Ok(ClockInOutcome::RejectedGeofenceViolation(
            GeofenceViolation::new(&zone, result.distance_meters),
        ));
    }

    Ok(ClockInOutcome::Accepted(AcceptedClockIn {
        point,
        zone,
        distance_meters: result.distance_meters,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory directory that records every query it receives
    struct FixedZones {
        zones: Vec<GeofenceZone>,
        queries: Mutex<Vec<ZoneQuery>>,
    }

    impl FixedZones {
        fn new(zones: Vec<GeofenceZone>) -> Self {
            Self {
                zones,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ZoneDirectory for FixedZones {
        async fn find_zone(&self, query: &ZoneQuery) -> AppResult<Option<GeofenceZone>> {
            self.queries.lock().unwrap().push(query.clone());
            let found = match query {
                ZoneQuery::ById(id) | ZoneQuery::Default(DefaultLocation::Id(id)) => {
                    self.zones.iter().find(|z| &z.id == id)
                }
                ZoneQuery::Default(DefaultLocation::First) => self.zones.first(),
                ZoneQuery::Default(DefaultLocation::None) => None,
            };
            Ok(found.cloned())
        }
    }

    struct BrokenZones;

    #[async_trait]
    impl ZoneDirectory for BrokenZones {
        async fn find_zone(&self, _query: &ZoneQuery) -> AppResult<Option<GeofenceZone>> {
            Err(AppError::Internal("database unavailable".to_string()))
        }
    }

    fn main_hospital() -> GeofenceZone {
        GeofenceZone {
            id: "main-hospital".to_string(),
            name: "Main Hospital Ward".to_string(),
            center: GeoPoint::new(37.7749, -122.4194),
            radius_meters: 100,
        }
    }

    fn emergency_wing() -> GeofenceZone {
        GeofenceZone {
            id: "emergency-wing".to_string(),
            name: "Emergency Wing".to_string(),
            center: GeoPoint::new(37.7849, -122.4094),
            radius_meters: 150,
        }
    }

    fn request(body: Value) -> ClockInRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn accepts_worker_at_zone_center() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({
            "latitude": 37.7749,
            "longitude": -122.4194,
            "locationId": "main-hospital"
        }));

        let outcome = validate_clock_in(&zones, &DefaultLocation::None, &req)
            .await
            .unwrap();

        match outcome {
            ClockInOutcome::Accepted(accepted) => {
                assert_eq!(accepted.distance_meters, 0);
                assert_eq!(accepted.zone.id, "main-hospital");
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn accepted_point_is_the_reported_position() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({
            "latitude": 37.7752,
            "longitude": -122.4191,
            "locationId": "main-hospital"
        }));

        let accepted = validate_clock_in(&zones, &DefaultLocation::None, &req)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(accepted.point, GeoPoint::new(37.7752, -122.4191));
        assert_ne!(accepted.point, accepted.zone.center);
        assert!(accepted.distance_meters > 0);
    }

    #[tokio::test]
    async fn rejects_worker_a_kilometer_away() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({
            "latitude": 37.7849,
            "longitude": -122.4194,
            "locationId": "main-hospital"
        }));

        let outcome = validate_clock_in(&zones, &DefaultLocation::None, &req)
            .await
            .unwrap();

        let ClockInOutcome::RejectedGeofenceViolation(violation) = outcome else {
            panic!("expected geofence violation, got {:?}", outcome);
        };
        assert_eq!(violation.distance_meters, 1112);
        assert_eq!(violation.max_distance_meters, 100);
        assert_eq!(violation.location_name, "Main Hospital Ward");
        assert_eq!(
            violation.message,
            "You are too far from the location to clock in. You are 1.1km away, but must be within 100m of Main Hospital Ward."
        );
    }

    #[tokio::test]
    async fn missing_latitude_skips_zone_lookup() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({ "longitude": -122.4194, "locationId": "main-hospital" }));

        let outcome = validate_clock_in(&zones, &DefaultLocation::First, &req)
            .await
            .unwrap();

        assert_eq!(outcome, ClockInOutcome::RejectedMissingCoordinates);
        assert_eq!(zones.query_count(), 0);
    }

    #[tokio::test]
    async fn non_numeric_coordinates_count_as_missing() {
        let zones = FixedZones::new(vec![main_hospital()]);
        for body in [
            json!({ "latitude": "37.7749", "longitude": -122.4194 }),
            json!({ "latitude": null, "longitude": -122.4194 }),
            json!({ "latitude": 37.7749, "longitude": [1, 2] }),
        ] {
            let outcome = validate_clock_in(&zones, &DefaultLocation::First, &request(body))
                .await
                .unwrap();
            assert_eq!(outcome, ClockInOutcome::RejectedMissingCoordinates);
        }
        assert_eq!(zones.query_count(), 0);
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_rejected() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({ "latitude": 137.7749, "longitude": -122.4194 }));

        let outcome = validate_clock_in(&zones, &DefaultLocation::First, &req)
            .await
            .unwrap();

        assert!(matches!(outcome, ClockInOutcome::RejectedInvalidCoordinates(_)));
        assert_eq!(zones.query_count(), 0);
    }

    #[tokio::test]
    async fn unknown_location_id_has_no_zone() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({
            "latitude": 37.7749,
            "longitude": -122.4194,
            "locationId": "west-annex"
        }));

        let outcome = validate_clock_in(&zones, &DefaultLocation::First, &req)
            .await
            .unwrap();

        assert_eq!(outcome, ClockInOutcome::RejectedNoZone);
    }

    #[tokio::test]
    async fn numeric_location_id_has_no_zone() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({
            "latitude": 37.7749,
            "longitude": -122.4194,
            "locationId": 42
        }));

        let outcome = validate_clock_in(&zones, &DefaultLocation::First, &req)
            .await
            .unwrap();

        assert_eq!(outcome, ClockInOutcome::RejectedNoZone);
        assert_eq!(zones.query_count(), 1);
    }

    #[tokio::test]
    async fn typed_notes_still_report_missing_coordinates() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({ "notes": 5, "locationId": "main-hospital" }));

        let outcome = validate_clock_in(&zones, &DefaultLocation::First, &req)
            .await
            .unwrap();

        assert_eq!(outcome, ClockInOutcome::RejectedMissingCoordinates);
        assert_eq!(zones.query_count(), 0);
    }

    #[test]
    fn request_field_accessors() {
        let req = request(json!({ "locationId": "  main-hospital ", "notes": "Night cover" }));
        assert_eq!(req.location_id().as_deref(), Some("main-hospital"));
        assert_eq!(req.notes().as_deref(), Some("Night cover"));

        let req = request(json!({ "locationId": null, "notes": { "text": "x" } }));
        assert_eq!(req.location_id(), None);
        assert_eq!(req.notes(), None);

        let req = request(json!({ "locationId": 42, "notes": ["a"] }));
        assert_eq!(req.location_id().as_deref(), Some("42"));
        assert_eq!(req.notes(), None);

        assert_eq!(request(json!({ "locationId": "   " })).location_id(), None);
    }

    #[tokio::test]
    async fn default_policy_none_requires_location_id() {
        let zones = FixedZones::new(vec![main_hospital()]);
        let req = request(json!({ "latitude": 37.7749, "longitude": -122.4194 }));

        let outcome = validate_clock_in(&zones, &DefaultLocation::None, &req)
            .await
            .unwrap();

        assert_eq!(outcome, ClockInOutcome::RejectedNoZone);
    }

    #[tokio::test]
    async fn default_policy_picks_configured_zone() {
        let zones = FixedZones::new(vec![main_hospital(), emergency_wing()]);
        let req = request(json!({ "latitude": 37.7849, "longitude": -122.4094, "locationId": "  " }));

        let first = validate_clock_in(&zones, &DefaultLocation::First, &req)
            .await
            .unwrap();
        assert!(matches!(first, ClockInOutcome::RejectedGeofenceViolation(_)));

        let fixed = validate_clock_in(
            &zones,
            &DefaultLocation::Id("emergency-wing".to_string()),
            &req,
        )
        .await
        .unwrap();
        assert!(matches!(fixed, ClockInOutcome::Accepted(ref a) if a.zone.id == "emergency-wing"));
    }

    #[tokio::test]
    async fn directory_failure_is_an_error_not_an_outcome() {
        let req = request(json!({ "latitude": 37.7749, "longitude": -122.4194 }));

        let result = validate_clock_in(&BrokenZones, &DefaultLocation::First, &req).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn rejections_map_to_app_errors() {
        assert!(matches!(
            ClockInOutcome::RejectedMissingCoordinates.into_result(),
            Err(AppError::MissingCoordinates)
        ));
        assert!(matches!(
            ClockInOutcome::RejectedNoZone.into_result(),
            Err(AppError::NoZoneAvailable)
        ));
        let violation = GeofenceViolation::new(&main_hospital(), 650);
        assert_eq!(
            violation.message,
            "You are too far from the location to clock in. You are 650m away, but must be within 100m of Main Hospital Ward."
        );
        assert!(matches!(
            ClockInOutcome::RejectedGeofenceViolation(violation).into_result(),
            Err(AppError::GeofenceViolation(_))
        ));
    }
}
