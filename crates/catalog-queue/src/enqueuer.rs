//! Enqueuer: turns eligible subjects into pending jobs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use catalog_core::config::QueueConfig;
use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_entity::job::{CreateJob, Job, JobKind};

use crate::manager::JobManager;
use crate::subject::SubjectCatalog;

/// Outcome of one eligibility scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Subjects returned by the eligibility query.
    pub scanned: usize,
    /// Jobs created.
    pub enqueued: usize,
    /// Subjects skipped because they already had an active job.
    pub skipped: usize,
}

/// Producer of pending jobs. Idempotent per subject.
#[derive(Debug, Clone)]
pub struct Enqueuer {
    manager: Arc<JobManager>,
    catalog: Arc<dyn SubjectCatalog>,
    default_kind: JobKind,
    default_max_attempts: i32,
    batch_size: i64,
}

impl Enqueuer {
    /// Create an enqueuer from the `[queue]` configuration section.
    pub fn new(
        manager: Arc<JobManager>,
        catalog: Arc<dyn SubjectCatalog>,
        config: &QueueConfig,
    ) -> AppResult<Self> {
        let default_kind = config
            .default_job_kind
            .parse::<JobKind>()
            .map_err(|e| AppError::configuration(format!("queue.default_job_kind: {e}")))?;

        Ok(Self {
            manager,
            catalog,
            default_kind,
            default_max_attempts: config.default_max_attempts,
            batch_size: config.scan_batch_size,
        })
    }

    /// Enqueue one subject unless it already has an active job.
    ///
    /// `None` means an active job already exists.
    pub async fn enqueue_subject(
        &self,
        subject_id: Uuid,
        payload_ref: &str,
        kind: Option<JobKind>,
        max_attempts: Option<i32>,
    ) -> AppResult<Option<Job>> {
        self.manager
            .enqueue_if_idle(CreateJob {
                subject_id,
                payload_ref: payload_ref.to_string(),
                job_kind: kind.unwrap_or(self.default_kind),
                max_attempts: max_attempts.unwrap_or(self.default_max_attempts),
            })
            .await
    }

    /// Enqueue one batch of never-queued subjects.
    pub async fn scan(&self) -> AppResult<ScanReport> {
        let subjects = self.catalog.eligible_subjects(self.batch_size).await?;
        let mut report = ScanReport {
            scanned: subjects.len(),
            ..ScanReport::default()
        };

        for subject in subjects {
            match self
                .enqueue_subject(subject.subject_id, &subject.payload_ref, None, None)
                .await
            {
                Ok(Some(_)) => report.enqueued += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    warn!(subject_id = %subject.subject_id, error = %e, "Failed to enqueue subject");
                }
            }
        }

        info!(
            scanned = report.scanned,
            enqueued = report.enqueued,
            skipped = report.skipped,
            "Catalog scan finished"
        );
        Ok(report)
    }
}
