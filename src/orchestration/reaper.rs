//! # Stale Copy Reaper
//!
//! A copy job can vanish without a trace: the broker accepted it but the
//! worker crashed past the redelivery budget, or an inline copy died with its
//! process. Versions left at `files_ready = 0` past the configured timeout
//! are moved to `-1`, so clients see an explicit failure they can re-trigger
//! instead of an endless "still copying".

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::database::ReviewStore;
use crate::error::{ReviewError, ReviewResult};

const REAP_BATCH_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct StaleCopyReaper {
    store: Arc<dyn ReviewStore>,
    stale_after: Duration,
    interval: Duration,
}

impl std::fmt::Debug for StaleCopyReaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleCopyReaper")
            .field("stale_after", &self.stale_after)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl StaleCopyReaper {
    pub fn new(store: Arc<dyn ReviewStore>, stale_after: Duration, interval: Duration) -> Self {
        Self {
            store,
            stale_after,
            interval,
        }
    }

    /// Mark every stale copying version as failed; returns how many were marked
    pub async fn reap_once(&self) -> ReviewResult<usize> {
        let stale_after = chrono::Duration::from_std(self.stale_after)
            .map_err(|e| ReviewError::internal(format!("invalid stale copy timeout: {e}")))?;
        let cutoff = Utc::now() - stale_after;

        let stale = self
            .store
            .find_stale_copies(cutoff, REAP_BATCH_LIMIT)
            .await?;
        if stale.is_empty() {
            debug!("No stale copies found");
            return Ok(0);
        }

        let mut reaped = 0;
        for version in stale {
            match self.store.mark_files_failed(version.id).await {
                Ok(true) => {
                    reaped += 1;
                    warn!(
                        task_id = version.task_id,
                        version_id = version.id,
                        stuck_since = %version.updated_at,
                        "🧹 Stale copy marked failed"
                    );
                }
                // Finished or re-triggered between the scan and the update
                Ok(false) => {}
                Err(e) => error!(
                    version_id = version.id,
                    error = %e,
                    "Failed to mark stale copy"
                ),
            }
        }

        Ok(reaped)
    }

    /// Reap on every interval tick until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_seconds = self.interval.as_secs(),
            stale_after_seconds = self.stale_after.as_secs(),
            "🧹 Stale copy reaper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.reap_once().await {
                        error!(error = %e, "Stale copy reap failed");
                    }
                }
            }
        }

        info!("Stale copy reaper stopped");
    }
}
