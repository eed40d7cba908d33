//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chrono::{Duration, Utc};
use forum_auth::{AuthConfig, db::DatabaseConfig};
use std::net::SocketAddr;

/// Default bind address when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:8081";

/// Minimum length of either signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Secrets and pepper
    pub security: SecurityConfig,
    /// Token lifetimes
    pub tokens: TokenLifetimeConfig,
    /// Origins allowed by CORS
    pub cors_allowed_origins: Vec<String>,
    /// Prometheus listener; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Seconds between expired refresh-token purges
    pub token_purge_interval_secs: u64,
}

/// Security-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// Access-token signing secret (required)
    pub access_token_secret: String,
    /// Refresh-token digest secret (required)
    pub refresh_token_secret: String,
    /// Password hashing pepper (optional)
    pub password_pepper: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig").finish_non_exhaustive()
    }
}

/// Token lifetimes in hours
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimeConfig {
    pub access_token_ttl_hours: i64,
    pub refresh_token_ttl_hours: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(bind_override, database_url_override, |key| {
            std::env::var(key).ok()
        })
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Bind address
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr(
                "SERVER_BIND",
                lookup("SERVER_BIND").as_deref().unwrap_or(DEFAULT_BIND),
            )?,
        };

        // Database configuration
        let defaults = DatabaseConfig::development();
        let database = DatabaseConfig {
            database_url: database_url_override
                .or_else(|| lookup("DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: parse_or(
                &lookup,
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: parse_or(
                &lookup,
                "DB_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout_secs,
            ),
            max_lifetime_secs: parse_or(
                &lookup,
                "DB_MAX_LIFETIME_SECS",
                defaults.max_lifetime_secs,
            ),
        };

        // Security configuration (REQUIRED)
        let access_token_secret = required_secret(&lookup, "ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required_secret(&lookup, "REFRESH_TOKEN_SECRET")?;

        let security = SecurityConfig {
            access_token_secret,
            refresh_token_secret,
            password_pepper: lookup("PASSWORD_PEPPER").unwrap_or_default(),
        };

        let tokens = TokenLifetimeConfig {
            access_token_ttl_hours: parse_or(
                &lookup,
                "ACCESS_TOKEN_TTL_HOURS",
                forum_auth::auth::DEFAULT_ACCESS_TOKEN_TTL_HOURS,
            ),
            refresh_token_ttl_hours: parse_or(
                &lookup,
                "REFRESH_TOKEN_TTL_HOURS",
                forum_auth::auth::DEFAULT_REFRESH_TOKEN_TTL_HOURS,
            ),
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let metrics_bind = lookup("METRICS_BIND")
            .map(|addr| parse_addr("METRICS_BIND", &addr))
            .transpose()?;

        Ok(ServerConfig {
            bind,
            database,
            security,
            tokens,
            cors_allowed_origins,
            metrics_bind,
            token_purge_interval_secs: parse_or(&lookup, "TOKEN_PURGE_INTERVAL_SECS", 3600),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.access_token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_TTL_HOURS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        for (var, hours) in [
            ("ACCESS_TOKEN_TTL_HOURS", self.tokens.access_token_ttl_hours),
            ("REFRESH_TOKEN_TTL_HOURS", self.tokens.refresh_token_ttl_hours),
        ] {
            let in_range = Duration::try_hours(hours)
                .is_some_and(|ttl| Utc::now().checked_add_signed(ttl).is_some());
            if !in_range {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("{hours}h puts the expiry past the supported date range"),
                });
            }
        }

        if self.tokens.refresh_token_ttl_hours <= self.tokens.access_token_ttl_hours {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_TTL_HOURS".to_string(),
                reason: format!(
                    "Must be greater than the access token lifetime ({}h)",
                    self.tokens.access_token_ttl_hours
                ),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.token_purge_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_PURGE_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Session settings for [`forum_auth::SessionManager`]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(
            self.security.access_token_secret.clone(),
            self.security.refresh_token_secret.clone(),
        )
        .with_pepper(self.security.password_pepper.clone())
        .with_access_token_ttl(ttl_hours(self.tokens.access_token_ttl_hours))
        .with_refresh_token_ttl(ttl_hours(self.tokens.refresh_token_ttl_hours))
    }
}

/// Lifetimes past chrono's range saturate; `SessionManager::new` rejects them
fn ttl_hours(hours: i64) -> Duration {
    Duration::try_hours(hours).unwrap_or(Duration::MAX)
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn required_secret<F>(lookup: &F, var: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup(var).ok_or_else(|| ConfigError::MissingRequired {
        var: var.to_string(),
        hint: "Generate with: openssl rand -hex 32".to_string(),
    })?;

    if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("Must be at least {MIN_SECRET_LEN} characters"),
        });
    }

    Ok(secret)
}

fn parse_addr(var: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("'{value}' is not an IP:PORT address"),
    })
}

/// Helper to parse a variable with default fallback
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
