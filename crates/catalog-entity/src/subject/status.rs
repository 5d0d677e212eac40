//! Subject catalog status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::job::JobStatus;

/// Catalog processing status of a subject, mirrored from its latest job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subject_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubjectStatus {
    /// Never queued.
    None,
    /// A job is waiting or claimed.
    Queued,
    /// A worker is producing output.
    Generating,
    /// Output is available.
    Ready,
    /// The latest job failed permanently.
    Failed,
}

impl SubjectStatus {
    /// Subject status that corresponds to a job entering `status`.
    pub fn for_job(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending | JobStatus::Claimed => Self::Queued,
            JobStatus::Processing => Self::Generating,
            JobStatus::Completed => Self::Ready,
            JobStatus::Failed => Self::Failed,
        }
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Queued => "queued",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SubjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
