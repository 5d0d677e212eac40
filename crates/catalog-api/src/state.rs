//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use catalog_database::DatabasePool;
use catalog_queue::{Enqueuer, JobManager};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Job lifecycle operations.
    pub manager: Arc<JobManager>,
    /// Idempotent job producer for manual enqueue requests.
    pub enqueuer: Arc<Enqueuer>,
    /// Database pool checked by `/status`; `None` for in-memory stores.
    pub database: Option<DatabasePool>,
    /// When the manager started, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Create state around a job manager and enqueuer.
    pub fn new(manager: Arc<JobManager>, enqueuer: Arc<Enqueuer>) -> Self {
        Self {
            manager,
            enqueuer,
            database: None,
            started_at: Instant::now(),
        }
    }

    /// Report the health of `database` on `/status`.
    pub fn with_database(mut self, database: DatabasePool) -> Self {
        self.database = Some(database);
        self
    }
}
