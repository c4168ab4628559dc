use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{account, manager, shifts};
use crate::middleware::auth::{auth_middleware, load_user, require_manager};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::user_rate_limit::create_staff_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let staff_governor = create_staff_governor();

    // Public routes (rate limited per IP)
    let public_routes = Router::new()
        .route("/health", get(account::health))
        .layer(create_public_governor());

    // Token only: the caller may not have a local record yet
    let sync_routes = Router::new()
        .route("/sync", post(account::sync_user))
        .layer(staff_governor.clone())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Any synced user
    let user_routes = Router::new()
        .route("/me", get(account::profile))
        .layer(staff_governor.clone())
        .layer(middleware::from_fn_with_state(state.clone(), load_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let shift_routes = Router::new()
        .route("/clock-in", post(shifts::clock_in))
        .route("/clock-out", post(shifts::clock_out))
        .route("/active", get(shifts::my_active_shift))
        .route("/mine", get(shifts::my_shifts))
        .layer(staff_governor)
        .layer(middleware::from_fn_with_state(state.clone(), load_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Manager routes (requires auth + manager role)
    let manager_routes = Router::new()
        .route("/users", get(manager::list_users))
        .route("/shifts", get(manager::all_shifts))
        .route("/shifts/active", get(manager::active_shifts))
        .route("/locations", get(manager::list_locations))
        .route("/locations", post(manager::create_location))
        .route("/locations/{id}", put(manager::update_location))
        .route("/analytics/daily", get(manager::daily_analytics))
        .route("/analytics/weekly", get(manager::weekly_analytics))
        .layer(middleware::from_fn(require_manager))
        .layer(middleware::from_fn_with_state(state.clone(), load_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", public_routes)
        .nest("/api/users", sync_routes.merge(user_routes))
        .nest("/api/shifts", shift_routes)
        .nest("/api/manager", manager_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DefaultLocation};
    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::Extension;
    use axum::http::{header, Request, StatusCode};
    use sea_orm::DatabaseConnection;
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState {
            db: DatabaseConnection::Disconnected,
            config: Config {
                database_url: "postgres://unused".to_string(),
                jwt_secret: "test-secret".to_string(),
                server_host: "127.0.0.1".to_string(),
                server_port: 0,
                default_location: DefaultLocation::None,
                seed_manager_email: None,
            },
        };
        create_router(state).layer(Extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)))))
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn clock_in_rejects_forged_token() {
        let request = Request::post("/api/shifts/clock-in")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"latitude":37.7749,"longitude":-122.4194}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn manager_routes_need_a_token() {
        let response = app()
            .oneshot(Request::get("/api/manager/users").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "UNAUTHORIZED");
        assert_eq!(body["message"], "Missing or malformed bearer token");
    }

    #[tokio::test]
    async fn non_bearer_authorization_is_unauthorized() {
        let request = Request::get("/api/shifts/active")
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "UNAUTHORIZED");
    }
}
