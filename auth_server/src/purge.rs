//! Background removal of expired refresh tokens.
//!
//! Expired tokens are already rejected (and deleted) when presented; this job
//! reclaims the rows of tokens that are never presented again.

use chrono::Utc;
use forum_auth::db::{
    RefreshTokenRepository,
    timeouts::{MAINTENANCE_TIMEOUT, TimeoutResult, with_timeout},
};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::metrics;

/// Delete every refresh token that has expired by now
pub async fn purge_once(store: &dyn RefreshTokenRepository) -> TimeoutResult<u64> {
    let purged = with_timeout(
        MAINTENANCE_TIMEOUT,
        store.purge_expired_refresh_tokens(Utc::now()),
    )
    .await?;

    metrics::refresh_tokens_purged_total(purged);
    Ok(purged)
}

/// Run [`purge_once`] every `interval` until the runtime shuts down.
///
/// Failures are logged and retried on the next tick.
pub fn spawn_purge_task(
    store: Arc<dyn RefreshTokenRepository>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match purge_once(store.as_ref()).await {
                Ok(0) => tracing::debug!("No expired refresh tokens to purge"),
                Ok(purged) => tracing::info!(purged, "Purged expired refresh tokens"),
                Err(e) => tracing::warn!("Refresh token purge failed: {}", e),
            }
        }
    })
}
