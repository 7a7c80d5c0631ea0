use crate::api::server::ApiState;
use crate::api::{auth, registries, settings, users};

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build all routes for the management API.
pub fn build_routes(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/api/health", get(health_handler))
        // Auth
        .route("/api/auth", post(auth::login_handler))
        // Settings
        .route(
            "/api/settings",
            get(settings::inspect_handler).put(settings::update_handler),
        )
        // Users
        .route(
            "/api/users/{id}/password",
            put(users::update_password_handler),
        )
        // Registry access per environment
        .route(
            "/api/endpoints/{id}/registries/{registry_id}",
            put(registries::update_access_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_handler(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
    })
}
