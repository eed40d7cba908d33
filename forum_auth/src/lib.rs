//! # Forum Auth
//!
//! Credential lifecycle for the forum backend. Users authenticate once with
//! email and password and receive two credentials:
//!
//! - a short-lived **access token**: an HS256-signed JWT carrying the user id and
//!   an absolute expiry, verified by downstream services without any I/O;
//! - a long-lived **refresh token**: an opaque random string tracked server-side
//!   and rotated on every use.
//!
//! ## Core Modules
//!
//! - [`auth`]: the session manager (register, login, refresh, logout) and the token codec
//! - [`db`]: the credential store traits with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use forum_auth::auth::{AuthConfig, RegisterRequest, SessionManager};
//! use forum_auth::db::MemoryCredentialStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), forum_auth::auth::AuthError> {
//! let config = AuthConfig::new(
//!     "access-secret-access-secret-0000",
//!     "refresh-secret-refresh-secret-00",
//! );
//! let sessions = SessionManager::with_store(Arc::new(MemoryCredentialStore::new()), config)?;
//!
//! let session = sessions
//!     .register(RegisterRequest {
//!         username: "alice".to_string(),
//!         email: "alice@x.com".to_string(),
//!         password: "pw123456".to_string(),
//!     })
//!     .await?;
//!
//! let rotated = sessions.refresh(&session.refresh_token).await?;
//! assert_ne!(rotated.refresh_token, session.refresh_token);
//! # Ok(())
//! # }
//! ```

/// Session lifecycle, token codec, and error taxonomy.
pub mod auth;

/// Credential store: repositories, connection pool, and migrations.
pub mod db;

pub use auth::{AuthConfig, AuthError, AuthResult, SessionManager, TokenCodec};
pub use db::{Database, DatabaseConfig, MemoryCredentialStore, PgCredentialStore};
