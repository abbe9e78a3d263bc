//! services/portal/src/web/rest.rs
//!
//! Contains the public REST handlers and the master definition for the
//! OpenAPI specification.

use crate::web::{admin, auth, state::AppState};
use apex_access_core::{AccessRequest, RequestStatus, Session, SubmitError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        submit_request_handler,
        me_handler,
        auth::login_handler,
        auth::logout_handler,
        admin::approve_handler,
        admin::reject_handler,
        admin::revoke_handler,
        admin::view_requests_handler,
        admin::view_users_handler,
        admin::clear_handler,
    ),
    components(
        schemas(
            SubmitAccessRequest,
            AccessRequestResponse,
            SessionResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            admin::ApproveRequest,
            admin::RejectRequest,
            admin::RevokeRequest,
            admin::OkResponse,
        )
    ),
    tags(
        (name = "APEX Access Gate", description = "Access requests, sessions and the admin console.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAccessRequest {
    pub email: String,
    pub full_name: String,
}

/// The public view of a freshly recorded access request.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestResponse {
    pub request_id: String,
    pub email: String,
    pub full_name: String,
    pub status: String,
}

impl From<AccessRequest> for AccessRequestResponse {
    fn from(request: AccessRequest) -> Self {
        let status = match request.status {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Revoked => "revoked",
        };
        Self {
            request_id: request.request_id,
            email: request.email,
            full_name: request.full_name,
            status: status.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub username: String,
    pub email: String,
    pub access_type: String,
    pub login_time: String,
    pub is_admin: bool,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Ask for access.
///
/// Records a pending request that an admin can later approve or reject.
#[utoipa::path(
    post,
    path = "/access/requests",
    request_body = SubmitAccessRequest,
    responses(
        (status = 201, description = "Request recorded", body = AccessRequestResponse),
        (status = 400, description = "Missing name or malformed email"),
        (status = 409, description = "A request is already pending or access is already granted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn submit_request_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitAccessRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !email_pattern().is_match(req.email.trim()) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please enter a valid email address".to_string(),
        ));
    }

    match state.registry.submit_request(&req.email, &req.full_name).await {
        Ok(request) => Ok((
            StatusCode::CREATED,
            Json(AccessRequestResponse::from(request)),
        )),
        Err(SubmitError::MissingField) => Err((
            StatusCode::BAD_REQUEST,
            SubmitError::MissingField.to_string(),
        )),
        Err(e @ (SubmitError::AlreadyPending(_) | SubmitError::AlreadyApproved(_))) => {
            Err((StatusCode::CONFLICT, e.to_string()))
        }
        Err(SubmitError::Port(e)) => {
            error!("Failed to record access request: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record access request".to_string(),
            ))
        }
    }
}

/// The session of the calling tab. Protected by the auth gate.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 303, description = "No valid session; redirect to the login page")
    )
)]
pub async fn me_handler(Extension(session): Extension<Session>) -> Json<SessionResponse> {
    Json(SessionResponse {
        is_admin: auth::is_admin(&session),
        username: session.username,
        email: session.email,
        access_type: session.access_type.to_string(),
        login_time: session.login_time.to_rfc3339(),
    })
}
