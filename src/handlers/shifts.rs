use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::shift::{self, ShiftStatus};
use crate::entities::{location, user};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::services::analytics::shift_hours;
use crate::services::clock_in::{validate_clock_in, ClockInRequest};
use crate::utils::geo::GeoPoint;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: i32,
}

impl From<location::Model> for LocationInfo {
    fn from(l: location::Model) -> Self {
        Self {
            id: l.id,
            name: l.name,
            latitude: l.latitude,
            longitude: l.longitude,
            radius: l.radius,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffInfo {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftResponse {
    pub id: Uuid,
    pub status: ShiftStatus,
    pub clock_in_time: DateTime<Utc>,
    pub clock_out_time: Option<DateTime<Utc>>,
    pub clock_in_lat: f64,
    pub clock_in_lng: f64,
    pub clock_out_lat: Option<f64>,
    pub clock_out_lng: Option<f64>,
    pub clock_in_note: Option<String>,
    pub clock_out_note: Option<String>,
    pub total_hours: Option<f64>,
    pub location: Option<LocationInfo>,
    pub user: Option<StaffInfo>,
}

impl ShiftResponse {
    pub fn build(s: shift::Model, location: Option<&location::Model>, user: Option<&user::Model>) -> Self {
        Self {
            id: s.id,
            status: s.status,
            clock_in_time: s.clock_in_time.with_timezone(&Utc),
            clock_out_time: s.clock_out_time.map(|t| t.with_timezone(&Utc)),
            clock_in_lat: s.clock_in_lat,
            clock_in_lng: s.clock_in_lng,
            clock_out_lat: s.clock_out_lat,
            clock_out_lng: s.clock_out_lng,
            clock_in_note: s.clock_in_note,
            clock_out_note: s.clock_out_note,
            total_hours: s.total_hours,
            location: location.cloned().map(LocationInfo::from),
            user: user.map(|u| StaffInfo {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
            }),
        }
    }
}

/// Attach location and staff details to a batch of shifts
pub async fn shift_responses(
    db: &DatabaseConnection,
    shifts: Vec<shift::Model>,
) -> AppResult<Vec<ShiftResponse>> {
    let locations = location::Entity::find().all(db).await?;
    let users = user::Entity::find().all(db).await?;

    Ok(shifts
        .into_iter()
        .map(|s| {
            let loc = locations.iter().find(|l| l.id == s.location_id);
            let u = users.iter().find(|u| u.id == s.user_id);
            ShiftResponse::build(s, loc, u)
        })
        .collect())
}

async fn find_active_shift(db: &DatabaseConnection, user_id: Uuid) -> AppResult<Option<shift::Model>> {
    Ok(shift::Entity::find()
        .filter(shift::Column::UserId.eq(user_id))
        .filter(shift::Column::Status.eq(ShiftStatus::ClockedIn))
        .one(db)
        .await?)
}

/// Trim a note, treating blank input as no note
fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

// ============ Clock In ============

const ACTIVE_SHIFT_EXISTS: &str = "User already has an active shift";

/// A concurrent clock-in that won the race trips the one-open-shift index
fn clock_in_insert_error(sql_err: Option<SqlErr>, err: DbErr) -> AppError {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::BadRequest(ACTIVE_SHIFT_EXISTS.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInShift {
    pub id: Uuid,
    pub clock_in_time: DateTime<Utc>,
    pub clock_in_lat: f64,
    pub clock_in_lng: f64,
    pub notes: Option<String>,
    pub location: LocationInfo,
}

#[derive(Debug, Serialize)]
pub struct ClockInResponse {
    pub success: bool,
    pub message: String,
    pub distance: i64,
    pub shift: ClockInShift,
}

/// Start a shift after the geofence check passes
pub async fn clock_in(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ClockInRequest>,
) -> AppResult<Json<ClockInResponse>> {
    if find_active_shift(&state.db, user.id).await?.is_some() {
        return Err(AppError::BadRequest(ACTIVE_SHIFT_EXISTS.to_string()));
    }

    let accepted = validate_clock_in(&state.db, &state.config.default_location, &payload)
        .await?
        .into_result()?;

    let now = Utc::now();
    let new_shift = shift::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        location_id: Set(accepted.zone.id.clone()),
        clock_in_time: Set(now.into()),
        clock_out_time: Set(None),
        // Record where the worker actually stood, never the zone center
        clock_in_lat: Set(accepted.point.latitude),
        clock_in_lng: Set(accepted.point.longitude),
        clock_out_lat: Set(None),
        clock_out_lng: Set(None),
        clock_in_note: Set(clean_note(payload.notes())),
        clock_out_note: Set(None),
        status: Set(ShiftStatus::ClockedIn),
        total_hours: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let shift = new_shift
        .insert(&state.db)
        .await
        .map_err(|e| clock_in_insert_error(e.sql_err(), e))?;

    let location = location::Entity::find_by_id(shift.location_id.clone())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Clock-in location disappeared".to_string()))?;

    tracing::info!(
        email = %user.email,
        location = %location.name,
        distance = accepted.distance_meters,
        "User clocked in"
    );

    Ok(Json(ClockInResponse {
        success: true,
        message: "Successfully clocked in".to_string(),
        distance: accepted.distance_meters,
        shift: ClockInShift {
            id: shift.id,
            clock_in_time: shift.clock_in_time.with_timezone(&Utc),
            clock_in_lat: shift.clock_in_lat,
            clock_in_lng: shift.clock_in_lng,
            notes: shift.clock_in_note,
            location: location.into(),
        },
    }))
}

// ============ Clock Out ============

#[derive(Debug, Default, Deserialize)]
pub struct ClockOutRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

impl ClockOutRequest {
    /// Clock-out position is optional, but must be complete and valid when sent
    fn point(&self) -> AppResult<Option<GeoPoint>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).validate().map(Some),
            (None, None) => Ok(None),
            _ => Err(AppError::BadRequest(
                "Provide both latitude and longitude, or neither".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClockOutResponse {
    pub success: bool,
    pub message: String,
    pub shift: ShiftResponse,
}

/// Close the caller's active shift
pub async fn clock_out(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ClockOutRequest>,
) -> AppResult<Json<ClockOutResponse>> {
    let point = payload.point()?;

    let active_shift = find_active_shift(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::BadRequest("No active shift found to clock out".to_string()))?;

    let now = Utc::now();
    let total_hours = shift_hours(active_shift.clock_in_time.with_timezone(&Utc), now);

    let mut active: shift::ActiveModel = active_shift.into();
    active.clock_out_time = Set(Some(now.into()));
    active.clock_out_lat = Set(point.map(|p| p.latitude));
    active.clock_out_lng = Set(point.map(|p| p.longitude));
    active.clock_out_note = Set(clean_note(payload.notes));
    active.status = Set(ShiftStatus::ClockedOut);
    active.total_hours = Set(Some(total_hours));
    active.updated_at = Set(now.into());
    let updated = active.update(&state.db).await?;

    let location = location::Entity::find_by_id(updated.location_id.clone())
        .one(&state.db)
        .await?;

    tracing::info!(email = %user.email, total_hours, "User clocked out");

    Ok(Json(ClockOutResponse {
        success: true,
        message: "Successfully clocked out".to_string(),
        shift: ShiftResponse::build(updated, location.as_ref(), Some(&user)),
    }))
}

// ============ Own Shifts ============

/// The caller's open shift, or `null`
pub async fn my_active_shift(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<Option<ShiftResponse>>> {
    let Some(active) = find_active_shift(&state.db, user.id).await? else {
        return Ok(Json(None));
    };

    let location = location::Entity::find_by_id(active.location_id.clone())
        .one(&state.db)
        .await?;

    Ok(Json(Some(ShiftResponse::build(
        active,
        location.as_ref(),
        Some(&user),
    ))))
}

/// The caller's shift history, newest first
pub async fn my_shifts(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<Vec<ShiftResponse>>> {
    let shifts = shift::Entity::find()
        .filter(shift::Column::UserId.eq(user.id))
        .order_by_desc(shift::Column::ClockInTime)
        .all(&state.db)
        .await?;

    Ok(Json(shift_responses(&state.db, shifts).await?))
}
