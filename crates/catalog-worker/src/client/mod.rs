//! Worker-side view of the Manager API.
//!
//! Every guarded call returns `Ok(true)` when accepted and `Ok(false)` when
//! the manager rejected it because the worker no longer owns the job. An
//! `Err` means the outcome is unknown (communication failure) or the
//! request itself was invalid.

pub mod http;
pub mod local;

use async_trait::async_trait;
use uuid::Uuid;

use catalog_core::result::AppResult;
use catalog_entity::job::{JobResult, WorkerClaim};

pub use http::HttpManagerClient;
pub use local::LocalManagerClient;

/// Operations a worker performs against the manager.
#[async_trait]
pub trait ManagerApi: Send + Sync + std::fmt::Debug {
    /// Claim the next pending job, if any.
    async fn claim(&self, worker_id: &str) -> AppResult<Option<WorkerClaim>>;

    /// Report progress with an optional stage label.
    async fn report_progress(
        &self,
        job_id: Uuid,
        worker_id: &str,
        stage: Option<&str>,
    ) -> AppResult<bool>;

    /// Refresh liveness of a held job.
    async fn heartbeat(&self, job_id: Uuid, worker_id: &str) -> AppResult<bool>;

    /// Report successful completion.
    async fn complete(&self, job_id: Uuid, worker_id: &str, result: &JobResult)
    -> AppResult<bool>;

    /// Report failure with a human-readable reason.
    async fn fail(&self, job_id: Uuid, worker_id: &str, reason: &str) -> AppResult<bool>;
}
