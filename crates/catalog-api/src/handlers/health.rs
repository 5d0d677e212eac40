//! Health and queue status handler.

use axum::Json;
use axum::extract::State;

use catalog_core::error::AppError;

use crate::dto::response::{ApiResponse, StatusResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /status
///
/// 503 when the database or the job store cannot be reached.
pub async fn status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let database = match &state.database {
        Some(db) => {
            db.health_check().await.map_err(|e| {
                tracing::warn!(error = %e, "Status check could not reach the database");
                AppError::service_unavailable("Database unavailable")
            })?;
            "connected"
        }
        None => "not_configured",
    };

    let queue = state.manager.queue_depth().await.map_err(|e| {
        tracing::warn!(error = %e, "Status check could not read the job store");
        AppError::service_unavailable("Job store unavailable")
    })?;

    Ok(Json(ApiResponse::ok(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database: database.to_string(),
        queue,
    })))
}
