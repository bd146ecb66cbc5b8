//! Background expiry of records under a TTL index.
//!
//! SQLite has no native TTL, so a monitor task periodically deletes records
//! older than each catalogued TTL index allows. Like a document store's TTL
//! monitor, expiry is eventual: a record can outlive its TTL by up to one
//! sweep interval.

use std::time::Duration;

use chatlog_types::error::StoreError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::collection::SqliteCollection;

/// Periodic TTL sweeper for a `SqliteCollection`.
pub struct TtlMonitor {
    collection: SqliteCollection,
    interval: Duration,
}

impl TtlMonitor {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

    pub fn new(collection: SqliteCollection) -> Self {
        Self {
            collection,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep. Returns the number of records removed.
    pub async fn sweep(&self) -> Result<u64, StoreError> {
        let purged = self.collection.purge_expired().await?;
        if purged > 0 {
            tracing::debug!(purged, "expired conversation records removed");
        }
        Ok(purged)
    }

    /// Sweep every `interval` until `cancel` fires.
    ///
    /// Sweep failures are logged and the loop keeps going.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("TTL monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep().await {
                            tracing::warn!(error = %e, "TTL sweep failed");
                        }
                    }
                }
            }
        })
    }
}
