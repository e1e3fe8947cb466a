use axum::{Json, extract::State, http::StatusCode};
use onair_model::{NewSchedule, Schedule};

use crate::{
    api_types::ApiResponse,
    infra::{app_state::AppState, errors::AppResult},
};

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<NewSchedule>,
) -> AppResult<(StatusCode, Json<ApiResponse<Schedule>>)> {
    let schedule = state.sessions().create_schedule(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(schedule))))
}
