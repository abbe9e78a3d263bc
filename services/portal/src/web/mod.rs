pub mod admin;
pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::{require_admin, require_session};
pub use rest::{me_handler, submit_request_handler};

use crate::error::ApiError;
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Builds the API router: public routes, gate-protected routes and the
/// admin console.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid allowed origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::ADMIN_TOKEN_HEADER),
        ]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/access/requests", post(submit_request_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (the auth gate runs first)
    let protected_routes = Router::new()
        .route("/me", get(me_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    // Operator console
    let admin_routes = Router::new()
        .route("/admin/approve", post(admin::approve_handler))
        .route("/admin/reject", post(admin::reject_handler))
        .route("/admin/revoke", post(admin::revoke_handler))
        .route("/admin/requests", get(admin::view_requests_handler))
        .route("/admin/users", get(admin::view_users_handler))
        .route("/admin/data", delete(admin::clear_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_admin,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(cors)
        .with_state(app_state))
}
