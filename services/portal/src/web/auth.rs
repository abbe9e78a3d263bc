//! services/portal/src/web/auth.rs
//!
//! Login and logout endpoints.
//!
//! Login compares the submitted password with the one issued at approval
//! time, writes the session keys into the caller's tab and starts the
//! periodic re-validation for that tab.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use apex_access_core::{AccessType, Session};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::adapters::{LogNotifier, TabStore};
use crate::error::ApiError;
use crate::web::state::AppState;

pub const TAB_COOKIE: &str = "tab";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: String,
    pub email: String,
    pub access_type: String,
}

//=========================================================================================
// Cookie helpers
//=========================================================================================

/// Extracts the tab id from the `Cookie` header, if present.
pub fn tab_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix("tab="))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn tab_cookie(tab_id: &str) -> String {
    // No Max-Age: the cookie lives as long as the browser session.
    format!("{}={}; HttpOnly; SameSite=Lax; Path=/", TAB_COOKIE, tab_id)
}

fn cleared_tab_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", TAB_COOKIE)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Start a session for an approved user
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or access not approved"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Look up the approved user
    let user = match state.registry.find_approved(&req.email).await? {
        Some(user) if user.password == req.password => user,
        Some(_) => {
            warn!("Wrong password for {}", req.email);
            return Ok((StatusCode::UNAUTHORIZED, "Invalid email or password").into_response());
        }
        None => {
            warn!("Login attempt by unapproved email {}", req.email);
            return Ok((StatusCode::UNAUTHORIZED, "Invalid email or password").into_response());
        }
    };

    // 2. Reuse the caller's tab if it has one
    let tab_id = tab_from_headers(&headers).unwrap_or_else(TabStore::new_tab_id);

    // 3. Write the session keys
    let session = Session::new(&user.full_name, &user.email, user.access_type.clone(), Utc::now());
    state.sessions_for(&tab_id).await.begin(&session).await?;

    // 4. Start the periodic check for this tab
    start_watch(&state, &tab_id).await;
    info!("{} logged in ({})", user.email, user.access_type);

    let response = LoginResponse {
        username: session.username,
        email: session.email,
        access_type: session.access_type.to_string(),
    };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, tab_cookie(&tab_id))],
        Json(response),
    )
        .into_response())
}

/// POST /auth/logout - End the tab's session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 303, description = "Session cleared; redirect to the login page")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let redirect = match tab_from_headers(&headers) {
        Some(tab_id) => {
            let redirect = state.sessions_for(&tab_id).await.logout().await?;
            state.tabs.close(&tab_id).await;
            redirect
        }
        None => apex_access_core::Redirect(state.config.auth.login_page.clone()),
    };

    Ok((
        [(header::SET_COOKIE, cleared_tab_cookie())],
        Redirect::to(redirect.location()),
    ))
}

/// Spawns the periodic gate check for `tab_id`, replacing any running one.
async fn start_watch(state: &Arc<AppState>, tab_id: &str) {
    let gate = Arc::new(state.gate_for(tab_id).await);
    let cancel = CancellationToken::new();
    let watch_id = state.tabs.set_watch(tab_id, cancel.clone()).await;

    let handle = gate.spawn_watch(Arc::new(LogNotifier::for_tab(tab_id)), cancel);
    let tabs = state.tabs.clone();
    let tab_id = tab_id.to_string();
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(Some(redirect))) => {
                info!("Tab {} must return to {}", tab_id, redirect.location());
                tabs.close_watched(&tab_id, watch_id).await;
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => error!("Session watch for tab {} failed: {:?}", tab_id, e),
            Err(e) => error!("Session watch for tab {} panicked: {:?}", tab_id, e),
        }
    });
}

/// Whether the session carries the admin access type.
pub fn is_admin(session: &Session) -> bool {
    session.access_type == AccessType::Admin
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_tab_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; tab=abc-123"));
        assert_eq!(tab_from_headers(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn empty_tab_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("tab="));
        assert_eq!(tab_from_headers(&headers), None);
    }
}
