//! services/portal/src/web/admin.rs
//!
//! The operator console: approve, reject and revoke by email, list both
//! collections, and wipe everything. Operations that find nothing to act
//! on answer `{"ok": false}` rather than an error status.

use crate::error::ApiError;
use crate::web::state::AppState;
use apex_access_core::{AccessRequest, AccessType, ApprovedUser};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub email: String,
    pub full_name: String,
    /// `user`, `student`, `admin`, or any other label.
    pub access_type: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectRequest {
    pub email: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RevokeRequest {
    pub email: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClearParams {
    /// Must be `true` for anything to be deleted.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl From<bool> for OkResponse {
    fn from(ok: bool) -> Self {
        Self { ok }
    }
}

#[utoipa::path(
    post,
    path = "/admin/approve",
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "`ok` is false when no pending request matches", body = OkResponse),
        (status = 401, description = "Missing or wrong admin token")
    )
)]
pub async fn approve_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let ok = state
        .registry
        .approve_user(
            &req.email,
            &req.full_name,
            AccessType::from(req.access_type),
            &req.password,
        )
        .await?;
    Ok(Json(ok.into()))
}

#[utoipa::path(
    post,
    path = "/admin/reject",
    request_body = RejectRequest,
    responses(
        (status = 200, description = "`ok` is false when no request matches", body = OkResponse),
        (status = 401, description = "Missing or wrong admin token")
    )
)]
pub async fn reject_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let ok = state.registry.reject_user(&req.email, &req.reason).await?;
    Ok(Json(ok.into()))
}

#[utoipa::path(
    post,
    path = "/admin/revoke",
    request_body = RevokeRequest,
    responses(
        (status = 200, description = "Access removed (also when there was none)", body = OkResponse),
        (status = 401, description = "Missing or wrong admin token")
    )
)]
pub async fn revoke_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let ok = state.registry.revoke_access(&req.email).await?;
    Ok(Json(ok.into()))
}

#[utoipa::path(
    get,
    path = "/admin/requests",
    responses(
        (status = 200, description = "Every stored access request"),
        (status = 401, description = "Missing or wrong admin token")
    )
)]
pub async fn view_requests_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AccessRequest>>, ApiError> {
    Ok(Json(state.registry.view_requests().await?))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "Every approved user"),
        (status = 401, description = "Missing or wrong admin token")
    )
)]
pub async fn view_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ApprovedUser>>, ApiError> {
    Ok(Json(state.registry.view_approved_users().await?))
}

#[utoipa::path(
    delete,
    path = "/admin/data",
    params(ClearParams),
    responses(
        (status = 200, description = "`ok` is false unless `confirm=true` was given", body = OkResponse),
        (status = 401, description = "Missing or wrong admin token")
    )
)]
pub async fn clear_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClearParams>,
) -> Result<Json<OkResponse>, ApiError> {
    let ok = state.registry.clear_all(&params.confirm).await?;
    Ok(Json(ok.into()))
}
