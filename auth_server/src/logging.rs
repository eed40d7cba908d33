//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; the subscriber installed
//! here also captures those records.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use auth_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// Never pass passwords or raw tokens in `message`.
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `request_id` - Optional request ID for correlation
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use auth_server::logging::log_security_event;
///
/// log_security_event(
///     "failed_login",
///     Some("5f2b7c1e-0000-4000-8000-000000000000"),
///     "Invalid credentials",
/// );
/// ```
pub fn log_security_event(event_type: &str, request_id: Option<&str>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        request_id = request_id,
        "SECURITY: {}",
        message
    );
}
