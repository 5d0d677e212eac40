//! Asset-backed subject catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use catalog_core::result::AppResult;
use catalog_database::repositories::AssetRepository;
use catalog_entity::job::{ExecutionContext, JobResult};
use catalog_entity::subject::{EligibleSubject, SubjectStatus};

use super::{ResolveError, SubjectCatalog};

#[async_trait]
impl SubjectCatalog for AssetRepository {
    async fn resolve_context(&self, subject_id: Uuid) -> Result<ExecutionContext, ResolveError> {
        AssetRepository::resolve_context(self, subject_id)
            .await?
            .ok_or(ResolveError::Unresolvable(subject_id))
    }

    async fn mark_status(
        &self,
        subject_id: Uuid,
        status: SubjectStatus,
        error: Option<&str>,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        self.set_status(subject_id, status, error, as_of).await
    }

    async fn apply_result(
        &self,
        subject_id: Uuid,
        result: &JobResult,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        AssetRepository::apply_result(self, subject_id, result, as_of).await
    }

    async fn eligible_subjects(&self, limit: i64) -> AppResult<Vec<EligibleSubject>> {
        self.find_eligible(limit).await
    }
}
