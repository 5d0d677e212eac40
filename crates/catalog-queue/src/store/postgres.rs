//! PostgreSQL job store backed by [`JobRepository`].

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use catalog_core::result::AppResult;
use catalog_database::repositories::JobRepository;
use catalog_entity::job::{CreateJob, Job, QueueDepth};

use super::JobStore;

#[async_trait]
impl JobStore for JobRepository {
    async fn enqueue(&self, data: &CreateJob) -> AppResult<Job> {
        self.create(data).await
    }

    async fn enqueue_if_idle(&self, data: &CreateJob) -> AppResult<Option<Job>> {
        self.create_if_idle(data).await
    }

    async fn claim_next(&self, worker_id: &str) -> AppResult<Option<Job>> {
        JobRepository::claim_next(self, worker_id).await
    }

    async fn report_progress(
        &self,
        id: Uuid,
        worker_id: &str,
        stage: Option<&str>,
    ) -> AppResult<Option<Job>> {
        JobRepository::report_progress(self, id, worker_id, stage).await
    }

    async fn heartbeat(&self, id: Uuid, worker_id: &str) -> AppResult<bool> {
        JobRepository::heartbeat(self, id, worker_id).await
    }

    async fn complete(
        &self,
        id: Uuid,
        worker_id: &str,
        result: &serde_json::Value,
    ) -> AppResult<Option<Job>> {
        JobRepository::complete(self, id, worker_id, result).await
    }

    async fn fail(&self, id: Uuid, worker_id: &str, reason: &str) -> AppResult<Option<Job>> {
        JobRepository::fail(self, id, worker_id, reason).await
    }

    async fn fail_permanently(
        &self,
        id: Uuid,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<Option<Job>> {
        JobRepository::fail_permanently(self, id, worker_id, reason).await
    }

    async fn expire_stale(&self, timeout: Duration, reason: &str) -> AppResult<Vec<Job>> {
        JobRepository::expire_stale(self, timeout, reason).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        JobRepository::find_by_id(self, id).await
    }

    async fn queue_depth(&self) -> AppResult<QueueDepth> {
        JobRepository::queue_depth(self).await
    }
}
