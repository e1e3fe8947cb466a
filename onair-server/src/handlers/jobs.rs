use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use onair_model::{Job, JobBackup, JobId, Session};

use crate::{
    api_types::{ApiResponse, JobFilter},
    infra::{app_state::AppState, errors::AppResult},
};

/// Restore a job from its most recent backup. The backup is kept.
pub async fn restore(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<ApiResponse<Job>>> {
    let job = state.cascade().restore(job_id).await?;
    Ok(Json(ApiResponse::success(job)))
}

pub async fn list_backups(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> AppResult<Json<ApiResponse<Vec<JobBackup>>>> {
    let backups = state.cascade().list_backups(filter.job_id).await?;
    Ok(Json(ApiResponse::success(backups)))
}

pub async fn run_now(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<(StatusCode, Json<ApiResponse<Session>>)> {
    let session = state.sessions().run_now(job_id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}
