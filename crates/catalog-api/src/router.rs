//! Route definitions for the Manager API.

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::AppState;

/// Build the router with all routes. Layers are added by [`crate::build_app`].
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(job_routes())
        .merge(subject_routes())
        .route("/status", get(handlers::health::status))
        .with_state(state)
}

/// Worker protocol plus job lookup
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/claim", post(handlers::jobs::claim_job))
        .route("/jobs/{id}", get(handlers::jobs::get_job))
        .route("/jobs/{id}/progress", put(handlers::jobs::report_progress))
        .route("/jobs/{id}/heartbeat", put(handlers::jobs::heartbeat))
        .route("/jobs/{id}/complete", put(handlers::jobs::complete_job))
        .route("/jobs/{id}/fail", put(handlers::jobs::fail_job))
}

/// Manual enqueue
fn subject_routes() -> Router<AppState> {
    Router::new().route(
        "/subjects/{id}/enqueue",
        post(handlers::subjects::enqueue_subject),
    )
}
