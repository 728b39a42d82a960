pub mod auth_routes;
pub mod live_routes;
pub mod notification_routes;
pub mod route_routes;
pub mod school_routes;
pub mod trip_routes;
pub mod user_routes;

use axum::{middleware::from_fn_with_state, response::Json, routing::{get, post}, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, cors_layer};
use crate::state::AppState;

/// Router completo de la aplicación
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/api/auth", auth_routes::create_auth_router())
        .nest("/api/routes", route_routes::create_route_router())
        .nest("/api/trips", trip_routes::create_trip_router())
        .nest("/api/live", live_routes::create_live_router())
        .nest("/api/users", user_routes::create_user_router())
        .nest("/api/notifications", notification_routes::create_notification_router())
        .nest("/api/schools", school_routes::create_school_router())
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth_routes::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "schools24-transport",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
