//! Worker-facing job handlers.
//!
//! Guarded calls answer 409 when the caller does not own the job; the
//! worker treats that as "stop working on it".

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use catalog_core::error::AppError;
use catalog_entity::job::{Job, JobStatus, WorkerClaim};

use crate::dto::request::{
    ClaimJobRequest, CompleteJobRequest, FailJobRequest, HeartbeatRequest, ProgressRequest,
};
use crate::dto::response::{ApiResponse, FailAck, JobAck};
use crate::error::ApiError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

fn not_owned(id: Uuid, worker_id: &str) -> ApiError {
    AppError::conflict(format!(
        "Job {id} is not held by worker '{worker_id}'"
    ))
    .into()
}

/// POST /jobs/claim
///
/// `data` is `null` when no job is available.
pub async fn claim_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ClaimJobRequest>,
) -> Result<Json<ApiResponse<Option<WorkerClaim>>>, ApiError> {
    let claim = state.manager.claim_next(&req.worker_id).await?;
    Ok(Json(ApiResponse::ok(claim)))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Job>>, ApiError> {
    let job = state
        .manager
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
    Ok(Json(ApiResponse::ok(job)))
}

/// PUT /jobs/{id}/progress
pub async fn report_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ProgressRequest>,
) -> Result<Json<ApiResponse<JobAck>>, ApiError> {
    let job = state
        .manager
        .report_progress(id, &req.worker_id, req.stage.as_deref())
        .await?
        .ok_or_else(|| not_owned(id, &req.worker_id))?;
    Ok(Json(ApiResponse::ok(JobAck::from(&job))))
}

/// PUT /jobs/{id}/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<HeartbeatRequest>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    if !state.manager.heartbeat(id, &req.worker_id).await? {
        return Err(not_owned(id, &req.worker_id));
    }
    Ok(Json(ApiResponse::ok(true)))
}

/// PUT /jobs/{id}/complete
pub async fn complete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CompleteJobRequest>,
) -> Result<Json<ApiResponse<JobAck>>, ApiError> {
    let job = state
        .manager
        .complete(id, &req.worker_id, &req.result)
        .await?
        .ok_or_else(|| not_owned(id, &req.worker_id))?;
    Ok(Json(ApiResponse::ok(JobAck::from(&job))))
}

/// PUT /jobs/{id}/fail
pub async fn fail_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<FailJobRequest>,
) -> Result<Json<ApiResponse<FailAck>>, ApiError> {
    let job = state
        .manager
        .fail(id, &req.worker_id, &req.error)
        .await?
        .ok_or_else(|| not_owned(id, &req.worker_id))?;
    Ok(Json(ApiResponse::ok(FailAck {
        job_id: job.id,
        status: job.status,
        attempts: job.attempts,
        requeued: job.status == JobStatus::Pending,
    })))
}
