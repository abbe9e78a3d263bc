//! End-to-end checks of the HTTP surface against an in-memory ledger.

use apex_access_core::memory::MemoryAccessRepository;
use apex_access_core::AccessRegistry;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use portal_lib::{
    config::Config,
    web::{self, state::AppState},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// ============================================================================
// Test Helpers
// ============================================================================

fn app_with(config: Config) -> Router {
    let registry = Arc::new(AccessRegistry::new(Arc::new(MemoryAccessRepository::new())));
    let state = Arc::new(AppState::new(registry, Arc::new(config)));
    web::router(state).unwrap()
}

fn app() -> Router {
    app_with(Config::default())
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn tab_cookie(resp: &Response) -> String {
    resp.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string()
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
}

async fn request_and_approve(app: &Router, email: &str, password: &str) {
    let resp = send(app, post_json("/access/requests", json!({"email": email, "fullName": "A"}))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        app,
        post_json(
            "/admin/approve",
            json!({"email": email.to_uppercase(), "fullName": "A", "accessType": "student", "password": password}),
        ),
    )
    .await;
    assert_eq!(json_body(resp).await, json!({"ok": true}));
}

async fn login(app: &Router, email: &str, password: &str) -> Response {
    send(app, post_json("/auth/login", json!({"email": email, "password": password}))).await
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn request_approve_login_and_revoke() {
    let app = app();

    let resp = send(&app, post_json("/access/requests", json!({"email": "a@x.com", "fullName": "A"}))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["status"], "pending");

    assert_eq!(login(&app, "a@x.com", "pw1").await.status(), StatusCode::UNAUTHORIZED);

    let resp = send(
        &app,
        post_json(
            "/admin/approve",
            json!({"email": "A@X.com", "fullName": "A", "accessType": "student", "password": "pw1"}),
        ),
    )
    .await;
    assert_eq!(json_body(resp).await, json!({"ok": true}));

    assert_eq!(login(&app, "a@x.com", "wrong").await.status(), StatusCode::UNAUTHORIZED);
    let resp = login(&app, "a@x.com", "pw1").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = tab_cookie(&resp);
    assert!(cookie.starts_with("tab="));

    let resp = send(&app, get_with_cookie("/me", &cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = json_body(resp).await;
    assert_eq!(me["email"], "a@x.com");
    assert_eq!(me["accessType"], "student");
    assert_eq!(me["isAdmin"], false);

    let resp = send(&app, post_json("/admin/revoke", json!({"email": "a@x.com"}))).await;
    assert_eq!(json_body(resp).await, json!({"ok": true}));

    let resp = send(&app, get_with_cookie("/me", &cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "login.html");
}

#[tokio::test]
async fn protected_page_without_tab_redirects() {
    let app = app();
    let resp = send(&app, Request::get("/me").body(Body::empty()).unwrap()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "login.html");
}

#[tokio::test]
async fn logout_clears_the_tab() {
    let app = app();
    request_and_approve(&app, "b@x.com", "pw").await;
    let cookie = tab_cookie(&login(&app, "b@x.com", "pw").await);

    let resp = send(
        &app,
        Request::post("/auth/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "login.html");

    let resp = send(&app, get_with_cookie("/me", &cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    // A second logout is harmless.
    let resp = send(&app, Request::post("/auth/logout").body(Body::empty()).unwrap()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn admin_operations_report_false_when_nothing_matches() {
    let app = app();

    let resp = send(
        &app,
        post_json(
            "/admin/approve",
            json!({"email": "ghost@x.com", "fullName": "G", "accessType": "user", "password": "pw"}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({"ok": false}));

    let resp = send(&app, post_json("/admin/reject", json!({"email": "ghost@x.com", "reason": "no"}))).await;
    assert_eq!(json_body(resp).await, json!({"ok": false}));

    let resp = send(&app, post_json("/admin/revoke", json!({"email": "nope@x.com"}))).await;
    assert_eq!(json_body(resp).await, json!({"ok": true}));

    let resp = send(&app, Request::get("/admin/users").body(Body::empty()).unwrap()).await;
    assert_eq!(json_body(resp).await, json!([]));
}

#[tokio::test]
async fn clearing_requires_confirmation() {
    let app = app();
    send(&app, post_json("/access/requests", json!({"email": "c@x.com", "fullName": "C"}))).await;

    let resp = send(&app, Request::delete("/admin/data").body(Body::empty()).unwrap()).await;
    assert_eq!(json_body(resp).await, json!({"ok": false}));
    let resp = send(&app, Request::get("/admin/requests").body(Body::empty()).unwrap()).await;
    assert_eq!(json_body(resp).await.as_array().map(Vec::len), Some(1));

    let resp = send(&app, Request::delete("/admin/data?confirm=true").body(Body::empty()).unwrap()).await;
    assert_eq!(json_body(resp).await, json!({"ok": true}));
    let resp = send(&app, Request::get("/admin/requests").body(Body::empty()).unwrap()).await;
    assert_eq!(json_body(resp).await, json!([]));
}

#[tokio::test]
async fn admin_token_is_enforced_when_configured() {
    let config = Config {
        admin_token: Some("secret".to_string()),
        ..Config::default()
    };
    let app = app_with(config);

    let resp = send(&app, Request::get("/admin/requests").body(Body::empty()).unwrap()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(
        &app,
        Request::get("/admin/requests")
            .header("x-admin-token", "secret")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_or_duplicate_requests_are_refused() {
    let app = app();

    let resp = send(&app, post_json("/access/requests", json!({"email": "not-an-email", "fullName": "D"}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&app, post_json("/access/requests", json!({"email": "d@x.com", "fullName": " "}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&app, post_json("/access/requests", json!({"email": "d@x.com", "fullName": "D"}))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(&app, post_json("/access/requests", json!({"email": "D@x.com", "fullName": "D"}))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
