//! HTTP API for the credential service.
//!
//! # Modules
//!
//! - [`auth`]: Registration, login, refresh, logout, and token introspection
//! - [`middleware`]: Access-token middleware for protected endpoints
//! - [`request_id`]: Request correlation and HTTP metrics
//!
//! # Endpoints Overview
//!
//! Every auth route is served both at the root and under `/api`.
//!
//! ```text
//! GET  /health              - Health check (public)
//! POST /auth/register       - Register user (public)
//! POST /auth/login          - Login (public)
//! POST /auth/refresh        - Rotate refresh token (public)
//! POST /auth/logout         - Discard refresh token (public)
//! GET  /auth/me             - Access-token introspection (auth required)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use auth_server::api::{AppState, cors_layer, create_router};
//! use forum_auth::{AuthConfig, MemoryCredentialStore, SessionManager};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let sessions = SessionManager::with_store(
//!     Arc::new(MemoryCredentialStore::new()),
//!     AuthConfig::new("access_secret", "refresh_secret"),
//! )?;
//!
//! let state = AppState {
//!     sessions: Arc::new(sessions),
//!     database: None,
//! };
//!
//! let app = create_router(state, cors_layer(&["http://localhost:3000".to_string()]));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8081").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use forum_auth::{Database, SessionManager};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    /// Present when the credential store is PostgreSQL; used by `/health`
    pub database: Option<Database>,
}

/// Build the CORS layer for the configured origins.
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Arguments
///
/// - `state`: Application state with the session manager
/// - `cors`: CORS policy applied to every route
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    let auth_routes = create_auth_router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes.clone())
        .nest("/api", auth_routes)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Routes under `/auth`
fn create_auth_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store is reachable, `503 Service Unavailable`
/// otherwise. `database` is `null` when running on the in-memory store.
///
/// ```bash
/// curl http://localhost:8081/health
/// # {"status":"healthy","database":true,"timestamp":"2026-01-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(db) => Some(db.health_check().await.is_ok()),
        None => None,
    };

    let healthy = database.unwrap_or(true);
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

/// JSON 404 for unknown routes
async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "path": uri.path(),
        })),
    )
}
