use axum::{
    Json,
    extract::{Query, State},
};
use onair_model::Session;

use crate::{
    api_types::{ApiResponse, JobFilter},
    infra::{app_state::AppState, errors::AppResult},
};

/// Sessions, newest first, optionally for one job.
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> AppResult<Json<ApiResponse<Vec<Session>>>> {
    let sessions = state.sessions().list_sessions(filter.job_id).await?;
    Ok(Json(ApiResponse::success(sessions)))
}
