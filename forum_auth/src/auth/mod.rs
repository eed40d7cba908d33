//! Authentication module providing registration, login, and refresh-token rotation.
//!
//! This module implements:
//! - Argon2id password hashing with an optional server-side pepper
//! - JWT access tokens (24-hour default expiry, HS256)
//! - Opaque refresh tokens (30-day default expiry) that are single-use: every
//!   refresh deletes the presented token and persists a new one
//!
//! Access tokens carry no server-side state and cannot be revoked before they
//! expire. Logging out only removes the refresh token.
//!
//! ## Example
//!
//! ```no_run
//! use forum_auth::auth::{AuthConfig, LoginRequest, SessionManager};
//! use forum_auth::db::{Database, DatabaseConfig, PgCredentialStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::default()).await?;
//!     let store = Arc::new(PgCredentialStore::new(db.pool().clone()));
//!     let sessions = SessionManager::with_store(
//!         store,
//!         AuthConfig::new("access_secret", "refresh_secret"),
//!     )?;
//!
//!     let session = sessions
//!         .login(LoginRequest {
//!             email: "alice@x.com".to_string(),
//!             password: "pw123456".to_string(),
//!         })
//!         .await?;
//!     println!("Logged in as {}", session.user.username);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod manager;
pub mod models;
pub mod tokens;

pub use config::{AuthConfig, DEFAULT_ACCESS_TOKEN_TTL_HOURS, DEFAULT_REFRESH_TOKEN_TTL_HOURS};
pub use errors::{AuthError, AuthResult, ErrorKind};
pub use manager::SessionManager;
pub use models::{
    AccessTokenClaims, AuthSession, LoginRequest, NewUser, RefreshRequest, RefreshTokenRecord,
    RegisterRequest, SessionTokens, StoredUser, User, UserId,
};
pub use tokens::{IssuedAccessToken, IssuedRefreshToken, TokenCodec};
