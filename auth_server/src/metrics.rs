//! Prometheus metrics for the credential service.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener.
//! Without an installed recorder every helper here is a no-op, so handlers
//! record unconditionally.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use auth_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/auth/login", 200);
//! ```

use forum_auth::{AuthError, auth::ErrorKind};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Label value for the outcome of an auth operation
pub fn outcome<T>(result: &Result<T, AuthError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => match e.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::TokenExpired => "token_expired",
            ErrorKind::Storage | ErrorKind::Signing | ErrorKind::Internal => "error",
        },
    }
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment registrations counter.
pub fn registrations_total(outcome: &'static str) {
    metrics::counter!("auth_registrations_total", "outcome" => outcome).increment(1);
}

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("auth_login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment refresh counter.
pub fn refresh_total(outcome: &'static str) {
    metrics::counter!("auth_refresh_total", "outcome" => outcome).increment(1);
}

/// Add purged refresh tokens.
pub fn refresh_tokens_purged_total(count: u64) {
    metrics::counter!("refresh_tokens_purged_total").increment(count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome(&Ok::<(), AuthError>(())), "success");
        assert_eq!(outcome::<()>(&Err(AuthError::UsernameTaken)), "conflict");
        assert_eq!(outcome::<()>(&Err(AuthError::TokenExpired)), "token_expired");
        assert_eq!(
            outcome::<()>(&Err(AuthError::Database(sqlx::Error::PoolTimedOut))),
            "error"
        );
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        registrations_total("success");
        login_attempts_total(false);
        refresh_total("invalid_token");
        refresh_tokens_purged_total(3);
    }
}
