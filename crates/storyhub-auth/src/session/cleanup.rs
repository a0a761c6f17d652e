//! Retention cleanup of expired session rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use storyhub_core::result::AppResult;

use super::store::SessionStore;

/// Deletes sessions that expired longer ago than the retention period.
#[derive(Debug, Clone)]
pub struct SessionCleanup {
    store: Arc<SessionStore>,
    retention: chrono::Duration,
}

impl SessionCleanup {
    /// Creates a cleanup handler keeping expired rows for `retention_hours`.
    pub fn new(store: Arc<SessionStore>, retention_hours: u64) -> Self {
        Self {
            store,
            retention: chrono::Duration::hours(retention_hours as i64),
        }
    }

    /// Runs one cleanup cycle and returns the number of sessions removed.
    pub async fn run_cleanup(&self) -> AppResult<usize> {
        let cutoff = Utc::now() - self.retention;
        let removal = self.store.delete_expired_before(cutoff).await?;

        if removal.count() > 0 {
            info!(
                count = removal.count(),
                cutoff = %cutoff,
                cache_invalidated = removal.cache_invalidated,
                "Expired sessions cleaned up"
            );
        }
        Ok(removal.count())
    }

    /// Run [`Self::run_cleanup`] every `interval` until the task is aborted.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_cleanup().await {
                    error!(error = %e, "Session cleanup failed");
                }
            }
        })
    }
}
