//! Stale-job reaper: reclaims jobs abandoned by dead or hung workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use catalog_core::config::ReaperConfig;
use catalog_core::result::AppResult;

use crate::manager::JobManager;

/// Periodic sweep over owned jobs whose heartbeat went silent.
#[derive(Debug, Clone)]
pub struct StaleJobReaper {
    manager: Arc<JobManager>,
    interval: Duration,
    timeout: Duration,
}

impl StaleJobReaper {
    /// Create a reaper from the `[reaper]` configuration section.
    pub fn new(manager: Arc<JobManager>, config: &ReaperConfig) -> Self {
        Self {
            manager,
            interval: Duration::from_secs(config.interval_seconds.max(1)),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Run one sweep, returning the number of jobs reclaimed.
    pub async fn sweep_once(&self) -> AppResult<usize> {
        let expired = self.manager.expire_stale(self.timeout).await?;
        if expired > 0 {
            info!(expired, timeout_seconds = self.timeout.as_secs(), "Stale jobs reclaimed");
        } else {
            debug!("No stale jobs");
        }
        Ok(expired)
    }

    /// Sweep every interval until the cancel signal is received or its
    /// sender is dropped.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            interval_seconds = self.interval.as_secs(),
            timeout_seconds = self.timeout.as_secs(),
            "Stale-job reaper started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop_requested(&mut cancel) => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "Stale-job sweep failed");
                    }
                }
            }
        }

        info!("Stale-job reaper stopped");
    }
}

/// Resolves once `true` is sent or the sender is gone.
async fn stop_requested(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}
