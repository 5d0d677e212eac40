//! Payload handed to a worker on a successful claim.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::model::Job;

/// Filesystem roots a worker needs to execute a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Absolute root that the job's `payload_ref` is relative to.
    pub source_root: String,
    /// Root under which generated artifacts are written.
    pub output_root: String,
}

impl ExecutionContext {
    /// Resolve `payload_ref` against the source root.
    ///
    /// Returns `None` for absolute references and references that climb
    /// out of the root.
    pub fn input_path(&self, payload_ref: &str) -> Option<PathBuf> {
        let relative = Path::new(payload_ref);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || payload_ref.is_empty() {
            return None;
        }
        Some(Path::new(&self.source_root).join(relative))
    }

    /// Directory receiving artifacts for one subject.
    pub fn output_dir(&self, job: &Job) -> PathBuf {
        Path::new(&self.output_root).join(job.subject_id.to_string())
    }
}

/// A claimed job together with its resolved execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerClaim {
    /// Snapshot of the job at claim time.
    pub job: Job,
    /// Resolved execution context.
    pub context: ExecutionContext,
}
