//! Response DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catalog_entity::job::{Job, JobStatus, QueueDepth};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Acknowledgement of an accepted worker call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAck {
    /// Job ID.
    pub job_id: Uuid,
    /// Status after the call.
    pub status: JobStatus,
}

impl From<&Job> for JobAck {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
        }
    }
}

/// Acknowledgement of an accepted failure report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailAck {
    /// Job ID.
    pub job_id: Uuid,
    /// `pending` when requeued, `failed` when terminal.
    pub status: JobStatus,
    /// Claims consumed so far.
    pub attempts: i32,
    /// Whether the job went back to the queue.
    pub requeued: bool,
}

/// Manager health and queue depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
    /// `connected`, or `not_configured` when running on in-memory stores.
    pub database: String,
    /// Jobs per status.
    pub queue: QueueDepth,
}
