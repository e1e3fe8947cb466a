use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    handlers::{jobs, license, schedules, sessions},
    infra::app_state::AppState,
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .merge(create_license_routes())
        .merge(create_job_routes())
}

fn create_license_routes() -> Router<AppState> {
    Router::new()
        .route("/license/issue", post(license::issue))
        .route("/license/revoke", post(license::revoke))
        .route("/license/activate", post(license::activate))
        .route("/license/renew", post(license::renew))
        .route("/license/state", get(license::get_state))
        .route("/license/outage-check", post(license::outage_check))
        .route("/license/metrics", get(license::metrics))
        .route("/license/activity", get(license::activity))
}

fn create_job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/backups", get(jobs::list_backups))
        .route("/jobs/{id}/restore", post(jobs::restore))
        .route("/jobs/{id}/run", post(jobs::run_now))
        .route("/schedules", post(schedules::create))
        .route("/sessions", get(sessions::list))
}
