//! In-process client for a worker embedded in the manager.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use catalog_core::result::AppResult;
use catalog_entity::job::{JobResult, WorkerClaim};
use catalog_queue::JobManager;

use super::ManagerApi;

/// Calls the [`JobManager`] directly, skipping HTTP.
#[derive(Debug, Clone)]
pub struct LocalManagerClient {
    manager: Arc<JobManager>,
}

impl LocalManagerClient {
    /// Create a client over a shared job manager.
    pub fn new(manager: Arc<JobManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ManagerApi for LocalManagerClient {
    async fn claim(&self, worker_id: &str) -> AppResult<Option<WorkerClaim>> {
        self.manager.claim_next(worker_id).await
    }

    async fn report_progress(
        &self,
        job_id: Uuid,
        worker_id: &str,
        stage: Option<&str>,
    ) -> AppResult<bool> {
        Ok(self
            .manager
            .report_progress(job_id, worker_id, stage)
            .await?
            .is_some())
    }

    async fn heartbeat(&self, job_id: Uuid, worker_id: &str) -> AppResult<bool> {
        self.manager.heartbeat(job_id, worker_id).await
    }

    async fn complete(
        &self,
        job_id: Uuid,
        worker_id: &str,
        result: &JobResult,
    ) -> AppResult<bool> {
        Ok(self
            .manager
            .complete(job_id, worker_id, result)
            .await?
            .is_some())
    }

    async fn fail(&self, job_id: Uuid, worker_id: &str, reason: &str) -> AppResult<bool> {
        Ok(self.manager.fail(job_id, worker_id, reason).await?.is_some())
    }
}
