//! License lifecycle endpoints.
//!
//! `GET /license/state` is not a pure read: outage enforcement runs as part
//! of it and may start grace or downgrade every premium job.

use axum::{
    Json,
    extract::{Query, State},
};
use onair_core::domain::license::IssueLicense;
use onair_model::{LicenseActivity, LicenseState, MemberLicense, TierCounts};

use crate::{
    api_types::{ActivateRequest, ActivityQuery, ApiResponse, RevokeRequest},
    infra::{app_state::AppState, errors::AppResult},
};

pub async fn issue(
    State(state): State<AppState>,
    Json(request): Json<IssueLicense>,
) -> AppResult<Json<ApiResponse<MemberLicense>>> {
    let member = state.licenses().issue(request).await?;
    Ok(Json(ApiResponse::success(member)))
}

pub async fn revoke(
    State(state): State<AppState>,
    Json(request): Json<RevokeRequest>,
) -> AppResult<Json<ApiResponse<MemberLicense>>> {
    let member = state.licenses().revoke(&request.install_id).await?;
    Ok(Json(ApiResponse::success(member)))
}

pub async fn activate(
    State(state): State<AppState>,
    Json(request): Json<ActivateRequest>,
) -> AppResult<Json<ApiResponse<LicenseState>>> {
    let license = state
        .licenses()
        .activate(&request.install_id, &request.secret)
        .await?;
    Ok(Json(ApiResponse::success(license)))
}

pub async fn renew(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<LicenseState>>> {
    let license = state.licenses().renew().await?;
    Ok(Json(ApiResponse::success(license)))
}

pub async fn get_state(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<LicenseState>>> {
    let license = state.licenses().get_state().await?;
    Ok(Json(ApiResponse::success(license)))
}

pub async fn outage_check(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<LicenseState>>> {
    let license = state.licenses().outage_check().await?;
    Ok(Json(ApiResponse::success(license)))
}

pub async fn metrics(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<TierCounts>>> {
    let counts = state.licenses().metrics().await?;
    Ok(Json(ApiResponse::success(counts)))
}

pub async fn activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<ApiResponse<Vec<LicenseActivity>>>> {
    let entries = state
        .licenses()
        .list_activity(query.effective_limit())
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}
