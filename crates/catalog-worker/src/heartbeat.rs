//! Per-job liveness: periodic heartbeats and stage reports.
//!
//! Both cancel the job's ownership token when the manager rejects a call,
//! which is how a worker learns its job was reaped. Communication failures
//! are logged and do not cancel anything.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::client::ManagerApi;
use crate::executor::ProgressSink;

/// Send heartbeats every `interval` until `lost` is cancelled or the
/// manager rejects one.
pub async fn heartbeat_loop(
    api: Arc<dyn ManagerApi>,
    job_id: Uuid,
    worker_id: String,
    interval: Duration,
    lost: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = lost.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match api.heartbeat(job_id, &worker_id).await {
            Ok(true) => trace!(job_id = %job_id, "Heartbeat accepted"),
            Ok(false) => {
                warn!(job_id = %job_id, worker_id = %worker_id, "Heartbeat rejected; job is no longer ours");
                lost.cancel();
                return;
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "Heartbeat failed; retrying next interval"),
        }
    }
}

/// Forwards stage changes to the manager.
#[derive(Debug, Clone)]
pub struct JobProgress {
    api: Arc<dyn ManagerApi>,
    job_id: Uuid,
    worker_id: String,
    lost: CancellationToken,
}

impl JobProgress {
    /// Create a reporter for one job.
    pub fn new(
        api: Arc<dyn ManagerApi>,
        job_id: Uuid,
        worker_id: String,
        lost: CancellationToken,
    ) -> Self {
        Self {
            api,
            job_id,
            worker_id,
            lost,
        }
    }
}

#[async_trait]
impl ProgressSink for JobProgress {
    async fn stage(&self, stage: &str) {
        match self
            .api
            .report_progress(self.job_id, &self.worker_id, Some(stage))
            .await
        {
            Ok(true) => debug!(job_id = %self.job_id, stage = %stage, "Stage reported"),
            Ok(false) => {
                warn!(job_id = %self.job_id, stage = %stage, "Progress rejected; job is no longer ours");
                self.lost.cancel();
            }
            Err(e) => warn!(job_id = %self.job_id, error = %e, "Progress report failed"),
        }
    }
}
