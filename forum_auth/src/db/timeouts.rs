//! Store operation timeout helpers
//!
//! The request path relies on the pool's acquire timeout alone. These wrappers
//! are for background jobs such as the expired-token purge, which must never
//! hang the task that drives them.

use std::time::Duration;
use tokio::time::timeout;

use crate::auth::AuthError;

/// Default timeout for maintenance queries (30 seconds)
pub const MAINTENANCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] AuthError),
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Execute a store operation with timeout
///
/// # Example
///
/// ```no_run
/// use forum_auth::db::{MemoryCredentialStore, RefreshTokenRepository};
/// use forum_auth::db::timeouts::{with_timeout, MAINTENANCE_TIMEOUT};
/// # async fn example(store: &MemoryCredentialStore) -> Result<(), Box<dyn std::error::Error>> {
///
/// let purged = with_timeout(
///     MAINTENANCE_TIMEOUT,
///     store.purge_expired_refresh_tokens(chrono::Utc::now()),
/// )
/// .await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, AuthError>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Store(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}
