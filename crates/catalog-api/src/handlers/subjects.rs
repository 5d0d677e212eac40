//! Operator handlers for subjects.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use catalog_core::error::AppError;
use catalog_entity::job::Job;

use crate::dto::request::EnqueueSubjectRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// POST /subjects/{id}/enqueue
///
/// 409 when the subject already has a non-terminal job.
pub async fn enqueue_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<EnqueueSubjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Job>>), ApiError> {
    let job = state
        .enqueuer
        .enqueue_subject(subject_id, &req.payload_ref, req.job_kind, req.max_attempts)
        .await?
        .ok_or_else(|| {
            AppError::conflict(format!("Subject {subject_id} already has an active job"))
        })?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(job))))
}
