use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::services::clock_in::GeofenceViolation;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Latitude and longitude are required to clock in")]
    MissingCoordinates,

    #[error("{0}")]
    InvalidCoordinates(String),

    #[error("No location available for clock-in")]
    NoZoneAvailable,

    #[error("{0}")]
    GeofenceViolation(GeofenceViolation),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingCoordinates
            | AppError::InvalidCoordinates(_)
            | AppError::NoZoneAvailable
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::GeofenceViolation(_) | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code placed in the `error` field of the body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingCoordinates => "MISSING_COORDINATES",
            AppError::InvalidCoordinates(_) => "INVALID_COORDINATES",
            AppError::NoZoneAvailable => "NO_ZONE_AVAILABLE",
            AppError::GeofenceViolation(_) => "GEOFENCE_VIOLATION",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match &self {
            AppError::GeofenceViolation(violation) => json!({
                "error": code,
                "message": violation.message,
                "details": {
                    "distance": violation.distance_meters,
                    "maxDistance": violation.max_distance_meters,
                    "locationName": violation.location_name,
                },
            }),
            AppError::Database(_) | AppError::Internal(_) => {
                // Internal details stay in the logs
                tracing::error!(error = %self, "Request failed with internal error");
                json!({ "error": code, "message": "Internal server error" })
            }
            _ => json!({ "error": code, "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
