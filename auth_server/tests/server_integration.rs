//! Integration tests for the HTTP front end.
//!
//! Drives the router with `oneshot` over the in-memory credential store.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use auth_server::api::{AppState, cors_layer, create_router};
use forum_auth::{AuthConfig, MemoryCredentialStore, SessionManager};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

/// Helper to create a test server over a fresh memory store
fn create_test_server() -> (axum::Router, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let sessions = SessionManager::with_store(
        store.clone(),
        AuthConfig::new(
            "test_access_secret_for_testing_only",
            "test_refresh_secret_for_testing_only",
        ),
    )
    .expect("Failed to create session manager");

    let state = AppState {
        sessions: Arc::new(sessions),
        database: None,
    };

    let app = create_router(state, cors_layer(&["http://localhost:3000".to_string()]));
    (app, store)
}

async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, request).await
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, body)
}

async fn register_alice(app: &axum::Router) -> Value {
    let (status, body) = post_json(
        app,
        "/auth/register",
        json!({"username": "alice", "email": "alice@x.com", "password": "pw123456"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

// ============================================================================
// Health & Routing
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let (app, _) = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["database"].is_null());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let (app, _) = create_test_server();

    let request = Request::builder()
        .uri("/nope")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/nope");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _) = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "trace-me-123"
    );
}

#[tokio::test]
async fn test_routes_are_mounted_under_api_prefix() {
    let (app, _) = create_test_server();

    let (status, body) = post_json(
        &app,
        "/api/auth/register",
        json!({"username": "bob", "email": "bob@x.com", "password": "pw123456"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post_json(
        &app,
        "/api/auth/refresh",
        json!({"refresh_token": body["refresh_token"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_returns_user_and_tokens() {
    let (app, _) = create_test_server();

    let body = register_alice(&app).await;

    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@x.com");
    assert!(body["user"]["id"].as_i64().unwrap() > 0);
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["access_token"].as_str().unwrap().contains('.'));
    assert_eq!(body["refresh_token"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_register_conflict_and_validation_are_bad_request() {
    let (app, store) = create_test_server();
    register_alice(&app).await;

    let (status, body) = post_json(
        &app,
        "/auth/register",
        json!({"username": "alice", "email": "other@x.com", "password": "pw"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already exists");

    let (status, _) = post_json(
        &app,
        "/auth/register",
        json!({"username": "carol", "email": "not-an-email", "password": "pw"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (app, _) = create_test_server();

    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert!(status.is_client_error());
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_failures_are_identical() {
    let (app, _) = create_test_server();
    register_alice(&app).await;

    let (wrong_status, wrong_body) = post_json(
        &app,
        "/auth/login",
        json!({"email": "alice@x.com", "password": "wrong"}),
    )
    .await;
    let (unknown_status, unknown_body) = post_json(
        &app,
        "/auth/login",
        json!({"email": "nobody@x.com", "password": "pw123456"}),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

// ============================================================================
// Refresh & Logout
// ============================================================================

#[tokio::test]
async fn test_refresh_unknown_token_is_unauthorized() {
    let (app, _) = create_test_server();

    let (status, body) = post_json(
        &app,
        "/auth/refresh",
        json!({"refresh_token": "deadbeef"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_logout_then_refresh_fails() {
    let (app, store) = create_test_server();
    let session = register_alice(&app).await;
    let refresh_token = session["refresh_token"].clone();

    let (status, body) = post_json(
        &app,
        "/auth/logout",
        json!({"refresh_token": refresh_token}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    assert_eq!(store.refresh_token_count().await, 0);

    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({"refresh_token": refresh_token}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Protected Routes
// ============================================================================

#[tokio::test]
async fn test_me_requires_valid_access_token() {
    let (app, _) = create_test_server();
    let session = register_alice(&app).await;

    let request = Request::builder()
        .uri("/auth/me")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/auth/me")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", session["access_token"].as_str().unwrap()),
        )
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], session["user"]["id"]);
    assert!(body["expires_at"].is_string());
}

// ============================================================================
// Scenario
// ============================================================================

#[tokio::test]
async fn test_alice_scenario_over_http() {
    let (app, _) = create_test_server();

    let registered = register_alice(&app).await;
    let user_id = registered["user"]["id"].clone();
    let t1 = registered["refresh_token"].clone();

    let (status, logged_in) = post_json(
        &app,
        "/auth/login",
        json!({"email": "alice@x.com", "password": "pw123456"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged_in["user"]["id"], user_id);
    let t2 = logged_in["refresh_token"].clone();

    let (status, rotated) =
        post_json(&app, "/auth/refresh", json!({"refresh_token": t2})).await;
    assert_eq!(status, StatusCode::OK);
    let t3 = rotated["refresh_token"].clone();
    assert_ne!(t3, t2);
    assert!(rotated["access_token"].is_string());

    let (status, _) = post_json(&app, "/auth/refresh", json!({"refresh_token": t2})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(&app, "/auth/refresh", json!({"refresh_token": t1})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(&app, "/auth/refresh", json!({"refresh_token": t3})).await;
    assert_eq!(status, StatusCode::OK);
}
