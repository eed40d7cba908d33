//! Immutable authentication configuration.

use chrono::Duration;

/// Default access-token lifetime in hours
pub const DEFAULT_ACCESS_TOKEN_TTL_HOURS: i64 = 24;

/// Default refresh-token lifetime in hours (30 days)
pub const DEFAULT_REFRESH_TOKEN_TTL_HOURS: i64 = 720;

/// Secrets and lifetimes used by [`SessionManager`](super::SessionManager).
///
/// Loaded once at startup and shared read-only by every request handler.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 key for access tokens
    pub access_token_secret: String,
    /// HMAC key used to derive the at-rest digest of refresh tokens
    pub refresh_token_secret: String,
    /// Server-side pepper appended to passwords before hashing
    pub password_pepper: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl AuthConfig {
    /// Create a configuration with default lifetimes and no pepper
    pub fn new(
        access_token_secret: impl Into<String>,
        refresh_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            access_token_secret: access_token_secret.into(),
            refresh_token_secret: refresh_token_secret.into(),
            password_pepper: String::new(),
            access_token_ttl: Duration::hours(DEFAULT_ACCESS_TOKEN_TTL_HOURS),
            refresh_token_ttl: Duration::hours(DEFAULT_REFRESH_TOKEN_TTL_HOURS),
        }
    }

    pub fn with_pepper(mut self, pepper: impl Into<String>) -> Self {
        self.password_pepper = pepper.into();
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_secret", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("password_pepper", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}
