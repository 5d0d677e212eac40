//! Subject resolver and status sink.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_entity::job::{ExecutionContext, JobResult};
use catalog_entity::subject::{EligibleSubject, SubjectStatus};

pub use memory::MemorySubjectCatalog;

/// Why a subject could not be resolved to an execution context.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The subject does not exist or its storage is unavailable.
    #[error("subject {0} is not resolvable")]
    Unresolvable(Uuid),

    /// The lookup itself failed.
    #[error(transparent)]
    Backend(#[from] AppError),
}

/// Subject-side collaborator of the job manager.
///
/// Status writes are denormalized views for dashboards; the job store
/// remains authoritative. Each write carries the `updated_at` of the job
/// transition it mirrors, and a write older than the last one applied to
/// the subject is dropped, so out-of-order deliveries cannot roll the
/// status back.
#[async_trait]
pub trait SubjectCatalog: Send + Sync + std::fmt::Debug {
    /// Resolve the storage roots a worker needs for `subject_id`.
    async fn resolve_context(&self, subject_id: Uuid) -> Result<ExecutionContext, ResolveError>;

    /// Record the subject's catalog status as of `as_of`.
    async fn mark_status(
        &self,
        subject_id: Uuid,
        status: SubjectStatus,
        error: Option<&str>,
        as_of: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Merge a completed job's result into the subject and mark it ready.
    async fn apply_result(
        &self,
        subject_id: Uuid,
        result: &JobResult,
        as_of: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Subjects that have never been queued, up to `limit`.
    async fn eligible_subjects(&self, limit: i64) -> AppResult<Vec<EligibleSubject>>;
}
