use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::shift::{self, ShiftStatus};
use crate::entities::{location, user};
use crate::error::{AppError, AppResult};
use crate::handlers::account::UserInfo;
use crate::handlers::shifts::{shift_responses, LocationInfo, ShiftResponse};
use crate::services::analytics::{daily_stats, hours_per_staff, DailyStats, StaffHours};
use crate::utils::geo::GeoPoint;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

// ============ Staff ============

/// List all users (manager)
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserInfo>>> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::Email)
        .all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// Everyone currently clocked in, most recent clock-ins first
pub async fn active_shifts(State(state): State<AppState>) -> AppResult<Json<Vec<ShiftResponse>>> {
    let shifts = shift::Entity::find()
        .filter(shift::Column::Status.eq(ShiftStatus::ClockedIn))
        .order_by_desc(shift::Column::ClockInTime)
        .all(&state.db)
        .await?;

    Ok(Json(shift_responses(&state.db, shifts).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl PageParams {
    /// Resolve to `(skip, take)` with `take` clamped to `1..=MAX_PAGE_SIZE`
    fn resolve(&self) -> (u64, u64) {
        let take = self.take.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (self.skip.unwrap_or(0), take)
    }
}

fn has_next_page(skip: u64, take: u64, total_count: u64) -> bool {
    skip.saturating_add(take) < total_count
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftConnection {
    pub shifts: Vec<ShiftResponse>,
    pub total_count: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Paginated shift history across all staff
pub async fn all_shifts(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<ShiftConnection>> {
    let (skip, take) = params.resolve();

    let total_count = shift::Entity::find().count(&state.db).await?;
    let shifts = shift::Entity::find()
        .order_by_desc(shift::Column::ClockInTime)
        .offset(skip)
        .limit(take)
        .all(&state.db)
        .await?;

    Ok(Json(ShiftConnection {
        shifts: shift_responses(&state.db, shifts).await?,
        total_count,
        has_next_page: has_next_page(skip, take, total_count),
        has_previous_page: skip > 0,
    }))
}

// ============ Locations ============

/// List all locations (manager)
pub async fn list_locations(State(state): State<AppState>) -> AppResult<Json<Vec<LocationInfo>>> {
    let locations = location::Entity::find()
        .order_by_asc(location::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(locations.into_iter().map(LocationInfo::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub id: Option<String>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<i32>,
}

fn check_radius(radius: i32) -> AppResult<i32> {
    if radius <= 0 {
        return Err(AppError::BadRequest("Radius must be a positive number of meters".to_string()));
    }
    Ok(radius)
}

/// `Main Hospital Ward` -> `main-hospital-ward`
fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Create a location (manager)
pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationRequest>,
) -> AppResult<Json<LocationInfo>> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Location name is required".to_string()));
    }
    let center = GeoPoint::new(payload.latitude, payload.longitude).validate()?;
    let radius = check_radius(payload.radius)?;

    let id = match payload.id.as_deref().map(slugify) {
        Some(id) if !id.is_empty() => id,
        _ => slugify(&name),
    };
    if id.is_empty() {
        return Err(AppError::BadRequest("Location id could not be derived from name".to_string()));
    }

    if location::Entity::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!("Location '{}' already exists", id)));
    }

    let now = Utc::now();
    let created = location::ActiveModel {
        id: Set(id),
        name: Set(name),
        latitude: Set(center.latitude),
        longitude: Set(center.longitude),
        radius: Set(radius),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(location = %created.id, radius = created.radius, "Location created");
    Ok(Json(created.into()))
}

/// Update a location's name, center or geofence radius (manager)
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLocationRequest>,
) -> AppResult<Json<LocationInfo>> {
    let existing = location::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))?;

    let center = if payload.latitude.is_some() || payload.longitude.is_some() {
        let point = GeoPoint::new(
            payload.latitude.unwrap_or(existing.latitude),
            payload.longitude.unwrap_or(existing.longitude),
        );
        Some(point.validate()?)
    } else {
        None
    };

    let mut active: location::ActiveModel = existing.into();

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Location name is required".to_string()));
        }
        active.name = Set(name);
    }

    if let Some(center) = center {
        active.latitude = Set(center.latitude);
        active.longitude = Set(center.longitude);
    }

    if let Some(radius) = payload.radius {
        active.radius = Set(check_radius(radius)?);
    }

    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.db).await?;

    tracing::info!(location = %updated.id, radius = updated.radius, "Location updated");
    Ok(Json(updated.into()))
}

// ============ Analytics ============

#[derive(Debug, Deserialize)]
pub struct DailyParams {
    pub date: Option<NaiveDate>,
}

/// Clock-in count, active staff and average hours for one day (UTC)
pub async fn daily_analytics(
    State(state): State<AppState>,
    Query(params): Query<DailyParams>,
) -> AppResult<Json<DailyStats>> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let start = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::BadRequest("Invalid date".to_string()))?
        .and_utc();
    let end = start + Duration::days(1);

    let shifts = shift::Entity::find()
        .filter(shift::Column::ClockInTime.gte(start))
        .filter(shift::Column::ClockInTime.lt(end))
        .all(&state.db)
        .await?;

    Ok(Json(daily_stats(date, &shifts)))
}

/// Hours worked per staff member over the last seven days
pub async fn weekly_analytics(State(state): State<AppState>) -> AppResult<Json<Vec<StaffHours>>> {
    let since = Utc::now() - Duration::days(7);

    let shifts = shift::Entity::find()
        .filter(shift::Column::ClockInTime.gte(since))
        .all(&state.db)
        .await?;
    let users = user::Entity::find().all(&state.db).await?;

    Ok(Json(hours_per_staff(since, &shifts, &users)))
}
