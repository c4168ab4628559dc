use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::utils::jwt::Claims;
use crate::db::SEED_SUBJECT_PREFIX;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserInfo {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
            updated_at: u.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserInfo,
}

/// Liveness probe
pub async fn health() -> &'static str {
    "Shift tracker is running"
}

/// Create or refresh the local record for the token's subject.
/// New accounts start as care workers; an existing role is never changed here.
pub async fn sync_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<UserEnvelope>> {
    let existing = user::Entity::find()
        .filter(user::Column::AuthSubject.eq(&claims.sub))
        .one(&state.db)
        .await?;

    let email_owner = user::Entity::find()
        .filter(user::Column::Email.eq(&claims.email))
        .one(&state.db)
        .await?;

    // A seeded placeholder is claimed by the first real login with its email
    let existing = match (existing, email_owner) {
        (Some(found), Some(owner)) if owner.id != found.id => {
            return Err(AppError::Conflict(
                "Email already linked to another account".to_string(),
            ));
        }
        (Some(found), _) => Some(found),
        (None, Some(owner)) if owner.auth_subject.starts_with(SEED_SUBJECT_PREFIX) => {
            tracing::info!(email = %owner.email, "Linking seeded account to identity provider");
            let mut active: user::ActiveModel = owner.into();
            active.auth_subject = Set(claims.sub.clone());
            Some(active.update(&state.db).await?)
        }
        (None, Some(_)) => {
            return Err(AppError::Conflict(
                "Email already linked to another account".to_string(),
            ));
        }
        (None, None) => None,
    };

    let now = Utc::now();
    let user = match existing {
        Some(found) => {
            let mut active: user::ActiveModel = found.into();
            active.email = Set(claims.email.clone());
            active.name = Set(claims.name.clone());
            active.updated_at = Set(now.into());
            active.update(&state.db).await?
        }
        None => {
            let new_user = user::ActiveModel {
                id: Set(Uuid::new_v4()),
                auth_subject: Set(claims.sub.clone()),
                email: Set(claims.email.clone()),
                name: Set(claims.name.clone()),
                role: Set(UserRole::CareWorker),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            };
            new_user.insert(&state.db).await?
        }
    };

    tracing::info!(email = %user.email, "User synced with database");

    Ok(Json(UserEnvelope {
        success: true,
        message: Some("User synced successfully".to_string()),
        user: user.into(),
    }))
}

/// Profile of the logged-in user
pub async fn profile(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        success: true,
        message: None,
        user: user.into(),
    })
}
