use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims};
use crate::AppState;

/// The local user behind the bearer token, set by `load_user`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

/// Extract and validate JWT token from Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(auth) = auth.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected request without a usable bearer token");
        AppError::Unauthorized("Missing or malformed bearer token".to_string())
    })?;
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Resolve the token subject to a synced user record
pub async fn load_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let subject = request
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.sub.clone())
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    let user = user::Entity::find()
        .filter(user::Column::AuthSubject.eq(subject))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found in database".to_string()))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Require manager role
pub async fn require_manager(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let CurrentUser(user) = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if user.role != UserRole::Manager {
        return Err(AppError::Forbidden("Manager access required".to_string()));
    }

    Ok(next.run(request).await)
}
