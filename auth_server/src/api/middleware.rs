//! Access-token middleware for protected endpoints.
//!
//! Extracts and validates the access token from the `Authorization` header,
//! then injects its [`AccessTokenClaims`](forum_auth::auth::AccessTokenClaims)
//! into request extensions.
//!
//! # Extracting Claims
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use forum_auth::auth::AccessTokenClaims;
//!
//! async fn protected_handler(Extension(claims): Extension<AccessTokenClaims>) -> String {
//!     format!("Authenticated as user {}", claims.sub)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use super::AppState;

/// Validate `Authorization: Bearer <token>` and inject the claims.
///
/// # Behavior
///
/// - **Success**: Token valid → Injects `AccessTokenClaims` into request extensions
///   → Calls next handler
/// - **Missing header**: Returns `401 Unauthorized`
/// - **Invalid format**: Returns `401 Unauthorized`
/// - **Invalid/expired token**: Returns `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match state.sessions.verify_access_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}
