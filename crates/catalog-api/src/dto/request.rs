//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use catalog_entity::job::{JobKind, JobResult};

/// Body of `POST /jobs/claim`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClaimJobRequest {
    /// Claiming worker.
    #[validate(length(min = 1, max = 128, message = "worker_id must be 1-128 characters"))]
    pub worker_id: String,
}

/// Body of `PUT /jobs/{id}/progress`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProgressRequest {
    /// Reporting worker.
    #[validate(length(min = 1, max = 128, message = "worker_id must be 1-128 characters"))]
    pub worker_id: String,
    /// New stage label; omitted keeps the current one.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub stage: Option<String>,
}

/// Body of `PUT /jobs/{id}/heartbeat`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HeartbeatRequest {
    /// Reporting worker.
    #[validate(length(min = 1, max = 128, message = "worker_id must be 1-128 characters"))]
    pub worker_id: String,
}

/// Body of `PUT /jobs/{id}/complete`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteJobRequest {
    /// Reporting worker.
    #[validate(length(min = 1, max = 128, message = "worker_id must be 1-128 characters"))]
    pub worker_id: String,
    /// Structured result; its kind must match the job's kind.
    pub result: JobResult,
}

/// Body of `PUT /jobs/{id}/fail`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FailJobRequest {
    /// Reporting worker.
    #[validate(length(min = 1, max = 128, message = "worker_id must be 1-128 characters"))]
    pub worker_id: String,
    /// Failure reason.
    #[validate(length(min = 1, max = 4096, message = "error must not be empty"))]
    pub error: String,
}

/// Body of `POST /subjects/{id}/enqueue`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EnqueueSubjectRequest {
    /// Input locator relative to the subject's storage root.
    #[validate(length(min = 1, message = "payload_ref is required"))]
    pub payload_ref: String,
    /// Job kind; the configured default when omitted.
    #[serde(default)]
    pub job_kind: Option<JobKind>,
    /// Retry ceiling; the configured default when omitted.
    #[serde(default)]
    #[validate(range(min = 1, max = 20))]
    pub max_attempts: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_id_bounds() {
        let empty = ClaimJobRequest {
            worker_id: String::new(),
        };
        assert!(empty.validate().is_err());

        let long = ClaimJobRequest {
            worker_id: "w".repeat(129),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_enqueue_max_attempts_range() {
        let body: EnqueueSubjectRequest =
            serde_json::from_str(r#"{"payload_ref": "a.mov", "max_attempts": 0}"#).unwrap();
        assert!(body.validate().is_err());

        let body: EnqueueSubjectRequest =
            serde_json::from_str(r#"{"payload_ref": "a.mov", "job_kind": "proxy"}"#).unwrap();
        assert!(body.validate().is_ok());
        assert_eq!(body.job_kind, Some(JobKind::Proxy));
    }
}
