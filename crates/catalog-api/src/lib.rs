//! # catalog-api
//!
//! Manager HTTP API built on Axum.
//!
//! Exposes the job store operations to remote workers (claim, progress,
//! heartbeat, complete, fail) plus operator endpoints for status, job
//! lookup, and manual enqueueing.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, serve, shutdown_signal};
pub use error::ApiError;
pub use state::AppState;
