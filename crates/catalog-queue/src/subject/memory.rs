//! In-memory subject catalog for single-node runs and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use catalog_core::error::AppError;
use catalog_core::result::AppResult;
use catalog_entity::job::{ExecutionContext, JobResult};
use catalog_entity::subject::{EligibleSubject, SubjectStatus};

use super::{ResolveError, SubjectCatalog};

/// State of one subject held by [`MemorySubjectCatalog`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    /// Input locator handed to the enqueuer.
    pub payload_ref: String,
    /// Execution context; `None` makes the subject unresolvable.
    pub context: Option<ExecutionContext>,
    /// Denormalized catalog status.
    pub status: SubjectStatus,
    /// Last recorded failure reason.
    pub error: Option<String>,
    /// Last applied result.
    pub result: Option<JobResult>,
    /// Job timestamp of the last applied status write.
    pub synced_at: Option<DateTime<Utc>>,
}

impl SubjectRecord {
    /// Accept a write stamped `as_of` unless a newer one was applied.
    fn advance(&mut self, as_of: DateTime<Utc>) -> bool {
        if self.synced_at.is_some_and(|synced| synced > as_of) {
            return false;
        }
        self.synced_at = Some(as_of);
        true
    }
}

#[derive(Debug, Default)]
struct InnerState {
    subjects: HashMap<Uuid, SubjectRecord>,
    /// Insertion order, used for eligibility scans.
    order: Vec<Uuid>,
    /// When set, every call fails as if the backend were down.
    unavailable: bool,
}

/// In-memory subject catalog.
#[derive(Debug, Clone, Default)]
pub struct MemorySubjectCatalog {
    state: Arc<Mutex<InnerState>>,
}

impl MemorySubjectCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subject with status `none`.
    pub async fn insert(
        &self,
        subject_id: Uuid,
        payload_ref: impl Into<String>,
        context: Option<ExecutionContext>,
    ) {
        let mut state = self.state.lock().await;
        let record = SubjectRecord {
            payload_ref: payload_ref.into(),
            context,
            status: SubjectStatus::None,
            error: None,
            result: None,
            synced_at: None,
        };
        if state.subjects.insert(subject_id, record).is_none() {
            state.order.push(subject_id);
        }
    }

    /// Replace a subject's execution context.
    pub async fn set_context(&self, subject_id: Uuid, context: Option<ExecutionContext>) {
        let mut state = self.state.lock().await;
        if let Some(record) = state.subjects.get_mut(&subject_id) {
            record.context = context;
        }
    }

    /// Simulate a backend outage.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Current record for a subject.
    pub async fn get(&self, subject_id: Uuid) -> Option<SubjectRecord> {
        self.state.lock().await.subjects.get(&subject_id).cloned()
    }

    /// Current status for a subject.
    pub async fn status(&self, subject_id: Uuid) -> Option<SubjectStatus> {
        self.get(subject_id).await.map(|record| record.status)
    }
}

impl InnerState {
    fn check_available(&self) -> AppResult<()> {
        if self.unavailable {
            return Err(AppError::service_unavailable("Subject catalog is unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SubjectCatalog for MemorySubjectCatalog {
    async fn resolve_context(&self, subject_id: Uuid) -> Result<ExecutionContext, ResolveError> {
        let state = self.state.lock().await;
        state.check_available()?;
        state
            .subjects
            .get(&subject_id)
            .and_then(|record| record.context.clone())
            .ok_or(ResolveError::Unresolvable(subject_id))
    }

    async fn mark_status(
        &self,
        subject_id: Uuid,
        status: SubjectStatus,
        error: Option<&str>,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let Some(record) = state.subjects.get_mut(&subject_id) else {
            return Ok(());
        };
        if record.advance(as_of) {
            record.status = status;
            record.error = error.map(str::to_string);
        }
        Ok(())
    }

    async fn apply_result(
        &self,
        subject_id: Uuid,
        result: &JobResult,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let Some(record) = state.subjects.get_mut(&subject_id) else {
            return Ok(());
        };
        if record.advance(as_of) {
            record.status = SubjectStatus::Ready;
            record.error = None;
            record.result = Some(result.clone());
        }
        Ok(())
    }

    async fn eligible_subjects(&self, limit: i64) -> AppResult<Vec<EligibleSubject>> {
        let state = self.state.lock().await;
        state.check_available()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(state
            .order
            .iter()
            .filter_map(|id| {
                let record = state.subjects.get(id)?;
                (record.status == SubjectStatus::None && record.context.is_some()).then(|| {
                    EligibleSubject {
                        subject_id: *id,
                        payload_ref: record.payload_ref.clone(),
                    }
                })
            })
            .take(limit)
            .collect())
    }
}
