//! services/portal/src/web/middleware.rs
//!
//! Middleware guarding the protected pages and the admin console.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use apex_access_core::GateState;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::web::auth::tab_from_headers;
use crate::web::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Runs the auth gate for the caller's tab.
///
/// If authenticated, inserts the `Session` into request extensions for
/// handlers to use. Otherwise the tab is closed and the caller is
/// redirected to the login page.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Find the caller's tab
    let Some(tab_id) = tab_from_headers(req.headers()) else {
        debug!("No tab cookie on protected request");
        return Ok(Redirect::to(&state.config.auth.login_page).into_response());
    };

    // 2. Evaluate the gate for that tab
    match state.gate_for(&tab_id).await.enter().await? {
        GateState::Authenticated(session) => {
            // 3. Hand the session to the handler
            req.extensions_mut().insert(session);
            Ok(next.run(req).await)
        }
        GateState::Unauthenticated(redirect) => {
            state.tabs.close(&tab_id).await;
            Ok(Redirect::to(redirect.location()).into_response())
        }
    }
}

/// Checks the `x-admin-token` header when an admin token is configured.
///
/// Without a configured token the console is open, like a browser console.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(expected) = state.config.admin_token.as_deref() {
        let supplied = req
            .headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        if supplied != Some(expected) {
            warn!("Rejected admin request without a valid token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }
    Ok(next.run(req).await)
}
