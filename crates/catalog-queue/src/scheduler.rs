//! Cron scheduler for the periodic enqueue scan.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use catalog_core::error::AppError;

use crate::enqueuer::Enqueuer;

/// Cron-based scheduler driving the [`Enqueuer`].
pub struct CatalogScheduler {
    scheduler: JobScheduler,
    enqueuer: Arc<Enqueuer>,
}

impl std::fmt::Debug for CatalogScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogScheduler").finish()
    }
}

impl CatalogScheduler {
    /// Create a new scheduler.
    pub async fn new(enqueuer: Arc<Enqueuer>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            enqueuer,
        })
    }

    /// Register the enqueue scan on `schedule` (cron with seconds).
    pub async fn register_scan(&self, schedule: &str) -> Result<(), AppError> {
        let enqueuer = Arc::clone(&self.enqueuer);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let enqueuer = Arc::clone(&enqueuer);
            Box::pin(async move {
                tracing::debug!("Running scheduled catalog scan");
                if let Err(e) = enqueuer.scan().await {
                    tracing::error!("Scheduled catalog scan failed: {}", e);
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid scan schedule '{}': {}", schedule, e))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add scan schedule: {}", e)))?;

        tracing::info!("Registered: catalog_scan ({})", schedule);
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Catalog scheduler started");
        Ok(())
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Catalog scheduler shut down");
        Ok(())
    }
}
