//! In-memory job store using a Tokio mutex for single-node deployments.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_entity::job::{CreateJob, Job, JobStatus, QueueDepth};

use super::JobStore;

/// Finished jobs kept by [`MemoryJobStore::new`].
pub const DEFAULT_FINISHED_RETENTION: usize = 10_000;

#[derive(Debug)]
struct InnerState {
    /// Jobs in creation order.
    jobs: Vec<Job>,
    /// Offset applied to the wall clock, moved forward by `advance_clock`.
    clock_offset: TimeDelta,
    /// Completed and failed jobs kept before the oldest are dropped.
    finished_retention: usize,
    /// Finished jobs already dropped, still counted by `queue_depth`.
    pruned: QueueDepth,
}

impl InnerState {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.clock_offset
    }

    fn owned_mut(&mut self, id: Uuid, worker_id: &str) -> Option<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|job| job.id == id && job.is_owned_by(worker_id))
    }

    fn has_active_job(&self, subject_id: Uuid) -> bool {
        self.jobs
            .iter()
            .any(|job| job.subject_id == subject_id && !job.status.is_terminal())
    }

    fn insert(&mut self, data: &CreateJob) -> Job {
        let now = self.now();
        let job = Job {
            id: Uuid::now_v7(),
            subject_id: data.subject_id,
            payload_ref: data.payload_ref.clone(),
            job_kind: data.job_kind,
            status: JobStatus::Pending,
            worker_id: None,
            stage: None,
            attempts: 0,
            max_attempts: data.max_attempts,
            error_message: None,
            result: None,
            claimed_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.push(job.clone());
        job
    }

    /// Drop the oldest finished jobs beyond the retention limit.
    fn prune_finished(&mut self) {
        let finished = self.jobs.iter().filter(|job| job.status.is_terminal()).count();
        let mut excess = finished.saturating_sub(self.finished_retention);
        if excess == 0 {
            return;
        }

        let pruned = &mut self.pruned;
        self.jobs.retain(|job| {
            if excess == 0 || !job.status.is_terminal() {
                return true;
            }
            excess -= 1;
            match job.status {
                JobStatus::Completed => pruned.completed += 1,
                _ => pruned.failed += 1,
            }
            false
        });
        debug!(retained = self.finished_retention, "Pruned finished jobs");
    }
}

/// Requeue `job` while attempts remain, otherwise fail it.
fn release(job: &mut Job, reason: &str, now: DateTime<Utc>) {
    if job.can_retry() {
        job.status = JobStatus::Pending;
        job.claimed_at = None;
    } else {
        job.status = JobStatus::Failed;
    }
    job.worker_id = None;
    job.stage = None;
    job.error_message = Some(reason.to_string());
    job.updated_at = now;
}

/// In-memory job store.
///
/// Every operation runs under one mutex, so each is atomic with respect
/// to the others. The store's clock can be moved forward with
/// [`MemoryJobStore::advance_clock`] to make staleness observable without
/// sleeping.
///
/// Completed and failed jobs are kept up to a retention limit; older ones
/// are dropped (and no longer found by ID) but still counted in
/// [`JobStore::queue_depth`].
#[derive(Debug, Clone)]
pub struct MemoryJobStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryJobStore {
    /// Create an empty store keeping [`DEFAULT_FINISHED_RETENTION`]
    /// finished jobs.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_FINISHED_RETENTION)
    }

    /// Create an empty store keeping at most `finished_retention`
    /// completed or failed jobs.
    pub fn with_retention(finished_retention: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(InnerState {
                jobs: Vec::new(),
                clock_offset: TimeDelta::zero(),
                finished_retention,
                pruned: QueueDepth::default(),
            })),
        }
    }

    /// Move the store's clock forward by `by`.
    pub async fn advance_clock(&self, by: TimeDelta) {
        let mut state = self.state.lock().await;
        state.clock_offset += by;
    }

    /// Copy of every job, in creation order.
    pub async fn snapshot(&self) -> Vec<Job> {
        self.state.lock().await.jobs.clone()
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, data: &CreateJob) -> AppResult<Job> {
        let mut state = self.state.lock().await;
        Ok(state.insert(data))
    }

    async fn enqueue_if_idle(&self, data: &CreateJob) -> AppResult<Option<Job>> {
        let mut state = self.state.lock().await;
        if state.has_active_job(data.subject_id) {
            return Ok(None);
        }
        Ok(Some(state.insert(data)))
    }

    async fn claim_next(&self, worker_id: &str) -> AppResult<Option<Job>> {
        let mut state = self.state.lock().await;
        let now = state.now();
        let Some(job) = state
            .jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Pending)
        else {
            return Ok(None);
        };

        job.status = JobStatus::Claimed;
        job.worker_id = Some(worker_id.to_string());
        job.attempts += 1;
        job.claimed_at = Some(now);
        job.updated_at = now;
        debug!(job_id = %job.id, worker_id = %worker_id, attempts = job.attempts, "Job claimed");
        Ok(Some(job.clone()))
    }

    async fn report_progress(
        &self,
        id: Uuid,
        worker_id: &str,
        stage: Option<&str>,
    ) -> AppResult<Option<Job>> {
        let mut state = self.state.lock().await;
        let now = state.now();
        Ok(state.owned_mut(id, worker_id).map(|job| {
            job.status = JobStatus::Processing;
            if let Some(stage) = stage {
                job.stage = Some(stage.to_string());
            }
            job.updated_at = now;
            job.clone()
        }))
    }

    async fn heartbeat(&self, id: Uuid, worker_id: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let now = state.now();
        Ok(state
            .owned_mut(id, worker_id)
            .map(|job| job.updated_at = now)
            .is_some())
    }

    async fn complete(
        &self,
        id: Uuid,
        worker_id: &str,
        result: &serde_json::Value,
    ) -> AppResult<Option<Job>> {
        let mut state = self.state.lock().await;
        let now = state.now();
        let job = state.owned_mut(id, worker_id).map(|job| {
            job.status = JobStatus::Completed;
            job.result = Some(result.clone());
            job.worker_id = None;
            job.stage = None;
            job.completed_at = Some(now);
            job.updated_at = now;
            job.clone()
        });
        state.prune_finished();
        Ok(job)
    }

    async fn fail(&self, id: Uuid, worker_id: &str, reason: &str) -> AppResult<Option<Job>> {
        let mut state = self.state.lock().await;
        let now = state.now();
        let job = state.owned_mut(id, worker_id).map(|job| {
            release(job, reason, now);
            job.clone()
        });
        state.prune_finished();
        Ok(job)
    }

    async fn fail_permanently(
        &self,
        id: Uuid,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<Option<Job>> {
        let mut state = self.state.lock().await;
        let now = state.now();
        let job = state.owned_mut(id, worker_id).map(|job| {
            job.status = JobStatus::Failed;
            job.worker_id = None;
            job.stage = None;
            job.error_message = Some(reason.to_string());
            job.updated_at = now;
            job.clone()
        });
        state.prune_finished();
        Ok(job)
    }

    async fn expire_stale(&self, timeout: Duration, reason: &str) -> AppResult<Vec<Job>> {
        let timeout = TimeDelta::from_std(timeout)
            .map_err(|e| AppError::validation(format!("Invalid staleness timeout: {e}")))?;
        let mut state = self.state.lock().await;
        let now = state.now();
        let cutoff = now - timeout;

        let mut expired = Vec::new();
        for job in state
            .jobs
            .iter_mut()
            .filter(|job| job.status.is_owned() && job.updated_at < cutoff)
        {
            release(job, reason, now);
            expired.push(job.clone());
        }
        state.prune_finished();
        Ok(expired)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        let state = self.state.lock().await;
        Ok(state.jobs.iter().find(|job| job.id == id).cloned())
    }

    async fn queue_depth(&self) -> AppResult<QueueDepth> {
        let state = self.state.lock().await;
        let mut depth = state.pruned;
        for status in JobStatus::ALL {
            let count = state.jobs.iter().filter(|job| job.status == status).count() as i64;
            match status {
                JobStatus::Completed => depth.completed += count,
                JobStatus::Failed => depth.failed += count,
                _ => depth.set(status, count),
            }
        }
        Ok(depth)
    }
}
