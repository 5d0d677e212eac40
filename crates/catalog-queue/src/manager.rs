//! Job manager: the operations the Manager API exposes to workers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use catalog_core::result::AppResult;
use catalog_entity::job::{CreateJob, Job, JobResult, JobStatus, QueueDepth, WorkerClaim};
use catalog_entity::subject::SubjectStatus;

use crate::store::JobStore;
use crate::subject::{ResolveError, SubjectCatalog};

/// Failure reason recorded for jobs released by the reaper.
pub const EXPIRED_REASON: &str = "expired: worker timeout";

/// Composes a [`JobStore`] with a [`SubjectCatalog`].
///
/// The store decides every state transition. Subject status writes that
/// follow a transition are best effort: a failing write is logged and the
/// transition still stands.
#[derive(Debug, Clone)]
pub struct JobManager {
    store: Arc<dyn JobStore>,
    catalog: Arc<dyn SubjectCatalog>,
}

impl JobManager {
    /// Create a new job manager.
    pub fn new(store: Arc<dyn JobStore>, catalog: Arc<dyn SubjectCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Create a pending job unconditionally.
    pub async fn enqueue(&self, data: CreateJob) -> AppResult<Job> {
        let job = self.store.enqueue(&data).await?;
        info!(job_id = %job.id, subject_id = %job.subject_id, kind = %job.job_kind, "Job enqueued");
        self.sync_subject(&job).await;
        Ok(job)
    }

    /// Create a pending job unless the subject already has a non-terminal one.
    pub async fn enqueue_if_idle(&self, data: CreateJob) -> AppResult<Option<Job>> {
        let job = self.store.enqueue_if_idle(&data).await?;
        match &job {
            Some(job) => {
                info!(job_id = %job.id, subject_id = %job.subject_id, kind = %job.job_kind, "Job enqueued");
                self.sync_subject(job).await;
            }
            None => debug!(subject_id = %data.subject_id, "Subject already has an active job"),
        }
        Ok(job)
    }

    /// Claim the oldest pending job and resolve its execution context.
    ///
    /// A job whose subject cannot be resolved is failed permanently and
    /// `None` is returned. If resolution fails for any other reason the
    /// job goes through the ordinary retry path and the error is returned.
    pub async fn claim_next(&self, worker_id: &str) -> AppResult<Option<WorkerClaim>> {
        let Some(job) = self.store.claim_next(worker_id).await? else {
            return Ok(None);
        };

        match self.catalog.resolve_context(job.subject_id).await {
            Ok(context) => {
                info!(
                    job_id = %job.id,
                    worker_id = %worker_id,
                    attempt = job.attempts,
                    max_attempts = job.max_attempts,
                    "Job claimed"
                );
                Ok(Some(WorkerClaim { job, context }))
            }
            Err(ResolveError::Unresolvable(subject_id)) => {
                let reason = format!("subject {subject_id} is not resolvable");
                warn!(job_id = %job.id, subject_id = %subject_id, "Failing unresolvable job");
                if let Some(job) = self
                    .store
                    .fail_permanently(job.id, worker_id, &reason)
                    .await?
                {
                    self.sync_subject(&job).await;
                }
                Ok(None)
            }
            Err(ResolveError::Backend(e)) => {
                warn!(job_id = %job.id, error = %e, "Context resolution failed, releasing job");
                let reason = format!("context resolution failed: {}", e.message);
                if let Some(job) = self.store.fail(job.id, worker_id, &reason).await? {
                    self.sync_subject(&job).await;
                }
                Err(e)
            }
        }
    }

    /// Record progress on an owned job. `None` means rejected.
    pub async fn report_progress(
        &self,
        id: Uuid,
        worker_id: &str,
        stage: Option<&str>,
    ) -> AppResult<Option<Job>> {
        let job = self.store.report_progress(id, worker_id, stage).await?;
        match &job {
            Some(job) => {
                debug!(job_id = %id, stage = ?job.stage, "Job progress");
                self.sync_subject(job).await;
            }
            None => debug!(job_id = %id, worker_id = %worker_id, "Progress rejected"),
        }
        Ok(job)
    }

    /// Refresh liveness of an owned job. `false` means rejected.
    pub async fn heartbeat(&self, id: Uuid, worker_id: &str) -> AppResult<bool> {
        let accepted = self.store.heartbeat(id, worker_id).await?;
        if !accepted {
            debug!(job_id = %id, worker_id = %worker_id, "Heartbeat rejected");
        }
        Ok(accepted)
    }

    /// Complete an owned job. `None` means rejected.
    ///
    /// Returns a validation error when `result` does not fit the job kind.
    pub async fn complete(
        &self,
        id: Uuid,
        worker_id: &str,
        result: &JobResult,
    ) -> AppResult<Option<Job>> {
        let Some(current) = self.store.find_by_id(id).await? else {
            debug!(job_id = %id, "Completion for unknown job rejected");
            return Ok(None);
        };
        if !current.is_owned_by(worker_id) {
            debug!(job_id = %id, worker_id = %worker_id, "Completion rejected");
            return Ok(None);
        }
        result.validate_for(current.job_kind)?;

        let value = serde_json::to_value(result)?;
        let Some(job) = self.store.complete(id, worker_id, &value).await? else {
            debug!(job_id = %id, worker_id = %worker_id, "Completion rejected");
            return Ok(None);
        };

        info!(job_id = %id, subject_id = %job.subject_id, "Job completed");
        if let Err(e) = self.catalog.apply_result(job.subject_id, result, job.updated_at).await {
            warn!(subject_id = %job.subject_id, error = %e, "Failed to apply job result to subject");
        }
        Ok(Some(job))
    }

    /// Fail an owned job. `None` means rejected; otherwise the returned
    /// job is `pending` when requeued and `failed` when terminal.
    pub async fn fail(&self, id: Uuid, worker_id: &str, reason: &str) -> AppResult<Option<Job>> {
        let job = self.store.fail(id, worker_id, reason).await?;
        match &job {
            Some(job) if job.status == JobStatus::Pending => {
                info!(job_id = %id, attempts = job.attempts, reason = %reason, "Job requeued");
                self.sync_subject(job).await;
            }
            Some(job) => {
                warn!(job_id = %id, attempts = job.attempts, reason = %reason, "Job failed permanently");
                self.sync_subject(job).await;
            }
            None => debug!(job_id = %id, worker_id = %worker_id, "Failure report rejected"),
        }
        Ok(job)
    }

    /// Release every owned job not refreshed within `timeout`.
    pub async fn expire_stale(&self, timeout: Duration) -> AppResult<usize> {
        let expired = self.store.expire_stale(timeout, EXPIRED_REASON).await?;
        for job in &expired {
            info!(
                job_id = %job.id,
                status = %job.status,
                attempts = job.attempts,
                "Reclaimed stale job"
            );
            self.sync_subject(job).await;
        }
        Ok(expired.len())
    }

    /// Look a job up by ID.
    pub async fn find(&self, id: Uuid) -> AppResult<Option<Job>> {
        self.store.find_by_id(id).await
    }

    /// Count jobs per status.
    pub async fn queue_depth(&self) -> AppResult<QueueDepth> {
        self.store.queue_depth().await
    }

    /// Mirror the job's status onto its subject, stamped with the job's
    /// `updated_at` so a delayed write cannot overtake a newer one.
    async fn sync_subject(&self, job: &Job) {
        let status = SubjectStatus::for_job(job.status);
        let error = match job.status {
            JobStatus::Pending | JobStatus::Failed => job.error_message.as_deref(),
            _ => None,
        };
        if let Err(e) = self
            .catalog
            .mark_status(job.subject_id, status, error, job.updated_at)
            .await {
            warn!(
                subject_id = %job.subject_id,
                status = %status,
                error = %e,
                "Failed to update subject status"
            );
        }
    }
}
