//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{JobKind, JobStatus};

/// A catalog job: one unit of proxy/metadata work for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Subject (asset) the job produces output for.
    pub subject_id: Uuid,
    /// Input locator, relative to the subject's storage root.
    pub payload_ref: String,
    /// What the job produces.
    pub job_kind: JobKind,
    /// Current status.
    pub status: JobStatus,
    /// Worker currently holding the job.
    pub worker_id: Option<String>,
    /// Progress label set by the owning worker.
    pub stage: Option<String>,
    /// Number of claims so far.
    pub attempts: i32,
    /// Retry ceiling.
    pub max_attempts: i32,
    /// Last failure reason.
    pub error_message: Option<String>,
    /// Result recorded on completion (JSON).
    pub result: Option<serde_json::Value>,
    /// When the current owner claimed the job.
    pub claimed_at: Option<DateTime<Utc>>,
    /// When the job completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// Last state-touching write or heartbeat.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Check whether `worker_id` currently owns this job.
    pub fn is_owned_by(&self, worker_id: &str) -> bool {
        self.status.is_owned() && self.worker_id.as_deref() == Some(worker_id)
    }

    /// Check whether another failure would be retried.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Subject the job is for.
    pub subject_id: Uuid,
    /// Input locator.
    pub payload_ref: String,
    /// Job kind.
    pub job_kind: JobKind,
    /// Retry ceiling.
    pub max_attempts: i32,
}

/// Number of jobs in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepth {
    /// Jobs waiting to be claimed.
    pub pending: i64,
    /// Jobs claimed without progress yet.
    pub claimed: i64,
    /// Jobs being processed.
    pub processing: i64,
    /// Completed jobs.
    pub completed: i64,
    /// Permanently failed jobs.
    pub failed: i64,
}

impl QueueDepth {
    /// Record `count` jobs in `status`.
    pub fn set(&mut self, status: JobStatus, count: i64) {
        match status {
            JobStatus::Pending => self.pending = count,
            JobStatus::Claimed => self.claimed = count,
            JobStatus::Processing => self.processing = count,
            JobStatus::Completed => self.completed = count,
            JobStatus::Failed => self.failed = count,
        }
    }

    /// Jobs currently held by workers.
    pub fn in_flight(&self) -> i64 {
        self.claimed + self.processing
    }
}
