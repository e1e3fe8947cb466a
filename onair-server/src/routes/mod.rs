pub mod v1;

use axum::{Json, Router, routing::get};

use crate::{api_types::HealthResponse, infra::app_state::AppState};

/// Create the main API router with all versions
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1::create_v1_router())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
