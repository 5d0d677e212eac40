//! Job store contract and its backends.
//!
//! Guarded operations return `None` (or `false`) when the `id + worker_id`
//! ownership predicate does not match a job in `claimed`/`processing`; in
//! that case nothing was written.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use catalog_core::result::AppResult;
use catalog_entity::job::{CreateJob, Job, QueueDepth};

pub use memory::MemoryJobStore;

/// Persistent owner of job records.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Create a pending job. Does not deduplicate.
    async fn enqueue(&self, data: &CreateJob) -> AppResult<Job>;

    /// Create a pending job unless the subject already has a
    /// non-terminal one.
    async fn enqueue_if_idle(&self, data: &CreateJob) -> AppResult<Option<Job>>;

    /// Claim the oldest pending job for `worker_id`.
    async fn claim_next(&self, worker_id: &str) -> AppResult<Option<Job>>;

    /// Move an owned job to `processing`, updating its stage when given.
    async fn report_progress(
        &self,
        id: Uuid,
        worker_id: &str,
        stage: Option<&str>,
    ) -> AppResult<Option<Job>>;

    /// Refresh the liveness timestamp of an owned job.
    async fn heartbeat(&self, id: Uuid, worker_id: &str) -> AppResult<bool>;

    /// Complete an owned job, storing its result.
    async fn complete(
        &self,
        id: Uuid,
        worker_id: &str,
        result: &serde_json::Value,
    ) -> AppResult<Option<Job>>;

    /// Release an owned job: requeue while attempts remain, else fail it.
    async fn fail(&self, id: Uuid, worker_id: &str, reason: &str) -> AppResult<Option<Job>>;

    /// Fail an owned job without consulting the retry ceiling.
    async fn fail_permanently(
        &self,
        id: Uuid,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<Option<Job>>;

    /// Release every owned job not refreshed within `timeout`.
    async fn expire_stale(&self, timeout: Duration, reason: &str) -> AppResult<Vec<Job>>;

    /// Look a job up by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Count jobs per status.
    async fn queue_depth(&self) -> AppResult<QueueDepth>;
}
