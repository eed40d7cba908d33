//! Authentication API handlers.
//!
//! This module provides HTTP REST endpoints for the credential lifecycle:
//! - Registration with username, email, and password
//! - Login with email and password
//! - Refresh-token rotation
//! - Logout to discard a refresh token
//!
//! All endpoints return JSON responses with either credentials or an
//! `{"error": "..."}` body. Server-side failures never leak their cause.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:8081/api/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "alice", "email": "alice@x.com", "password": "pw123456"}'
//! ```
//!
//! Refresh:
//! ```bash
//! curl -X POST http://localhost:8081/api/auth/refresh \
//!   -H "Content-Type: application/json" \
//!   -d '{"refresh_token": "9f86d081884c7d65..."}'
//! ```

use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use forum_auth::{
    AuthError,
    auth::{
        AccessTokenClaims, AuthSession, LoginRequest, RefreshRequest, RegisterRequest,
        SessionTokens, UserId,
    },
};
use serde::Serialize;

use super::{AppState, request_id::RequestId};
use crate::{logging::log_security_event, metrics};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Identity behind a verified access token
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an auth error to a response; caller faults get `client_status`
fn error_response(err: &AuthError, client_status: StatusCode) -> ApiError {
    let status = if err.is_internal() {
        tracing::error!("Request failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        client_status
    };

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Register a new user account and open a session.
///
/// # Request Body
///
/// ```json
/// {
///   "username": "alice",
///   "email": "alice@x.com",
///   "password": "pw123456"
/// }
/// ```
///
/// # Response
///
/// On success, returns `201 Created`:
/// ```json
/// {
///   "user": {"id": 1, "username": "alice", "email": "alice@x.com", "created_at": "..."},
///   "access_token": "eyJhbGciOiJIUzI1NiIs...",
///   "refresh_token": "9f86d081884c7d65..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing field, malformed email, or username/email taken
/// - `500 Internal Server Error`: Storage or signing failure
pub async fn register(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let result = state.sessions.register(payload).await;
    metrics::registrations_total(metrics::outcome(&result));

    match result {
        Ok(session) => {
            tracing::info!(
                request_id = %request_id.as_str(),
                user_id = session.user.id,
                "User registered"
            );
            Ok((StatusCode::CREATED, Json(session)))
        }
        Err(e) => Err(error_response(&e, StatusCode::BAD_REQUEST)),
    }
}

/// Authenticate with email and password.
///
/// Unknown email and wrong password produce the same `401` body.
///
/// # Response
///
/// On success, returns `200 OK` with the same shape as registration.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `500 Internal Server Error`: Storage or signing failure
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthSession>, ApiError> {
    let result = state.sessions.login(payload).await;
    metrics::login_attempts_total(result.is_ok());

    match result {
        Ok(session) => Ok(Json(session)),
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                log_security_event(
                    "failed_login",
                    Some(request_id.as_str()),
                    "Invalid credentials",
                );
            }
            Err(error_response(&e, StatusCode::UNAUTHORIZED))
        }
    }
}

/// Exchange a refresh token for a new access/refresh pair.
///
/// The presented refresh token is consumed.
///
/// # Response
///
/// ```json
/// {
///   "access_token": "eyJhbGciOiJIUzI1NiIs...",
///   "refresh_token": "3c59dc048e885024..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown, consumed, or expired refresh token
/// - `500 Internal Server Error`: Storage or signing failure
pub async fn refresh(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<SessionTokens>, ApiError> {
    let result = state.sessions.refresh(&payload.refresh_token).await;
    metrics::refresh_total(metrics::outcome(&result));

    match result {
        Ok(tokens) => Ok(Json(tokens)),
        Err(e) => {
            if matches!(e, AuthError::InvalidToken) && !payload.refresh_token.is_empty() {
                log_security_event(
                    "refresh_rejected",
                    Some(request_id.as_str()),
                    "Unknown or already used refresh token",
                );
            }
            Err(error_response(&e, StatusCode::UNAUTHORIZED))
        }
    }
}

/// Discard a refresh token.
///
/// Returns `204 No Content` whether or not the token existed. Access tokens
/// already issued stay valid until they expire.
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .logout(&payload.refresh_token)
        .await
        .map_err(|e| error_response(&e, StatusCode::BAD_REQUEST))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Describe the caller's access token. Requires `Authorization: Bearer <access token>`.
pub async fn me(Extension(claims): Extension<AccessTokenClaims>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: claims.sub,
        expires_at: claims.expires_at(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_statuses() {
        let (status, body) = error_response(&AuthError::EmailTaken, StatusCode::BAD_REQUEST);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Email already exists");

        let (status, _) = error_response(&AuthError::TokenExpired, StatusCode::UNAUTHORIZED);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let (status, body) = error_response(
            &AuthError::Database(sqlx::Error::PoolTimedOut),
            StatusCode::UNAUTHORIZED,
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
    }
}
