//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Username already exists
    #[error("Username already exists")]
    UsernameTaken,

    /// Email already exists
    #[error("Email already exists")]
    EmailTaken,

    /// Unknown email or wrong password; the two cases are deliberately identical
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token is unknown, already consumed, forged, malformed, or (for access tokens) expired
    #[error("Invalid token")]
    InvalidToken,

    /// Refresh token was found but its expiry has passed
    #[error("Token expired")]
    TokenExpired,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// JWT signing error
    #[error("JWT signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// A signing secret was not configured
    #[error("Signing secret not configured: {0}")]
    MissingSecret(&'static str),

    /// A token lifetime puts the expiry outside the representable date range
    #[error("Token lifetime out of range: {0}")]
    LifetimeOutOfRange(chrono::Duration),
}

/// Coarse classification of [`AuthError`] used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    InvalidCredentials,
    InvalidToken,
    TokenExpired,
    Storage,
    Signing,
    Internal,
}

impl AuthError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::UsernameTaken | AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AuthError::InvalidToken => ErrorKind::InvalidToken,
            AuthError::TokenExpired => ErrorKind::TokenExpired,
            AuthError::Database(_) => ErrorKind::Storage,
            AuthError::Signing(_)
            | AuthError::MissingSecret(_)
            | AuthError::LifetimeOutOfRange(_) => ErrorKind::Signing,
            AuthError::HashingFailed => ErrorKind::Internal,
        }
    }

    /// Whether the error is the server's fault rather than the caller's
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Storage | ErrorKind::Signing | ErrorKind::Internal
        )
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database, hashing, and signing errors collapse into a generic message so
    /// that storage details and key configuration never reach the caller.
    pub fn client_message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
