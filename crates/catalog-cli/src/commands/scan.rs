//! One-shot eligibility scan.

use std::sync::Arc;

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_queue::Enqueuer;

use crate::output::{self, OutputFormat};

/// Enqueue one batch of never-queued subjects
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let backend = super::Backend::connect(config).await?;
    let enqueuer = Enqueuer::new(
        Arc::clone(&backend.manager),
        backend.assets.clone(),
        &config.queue,
    )?;

    let report = enqueuer.scan().await?;
    backend.close().await;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_success("Catalog scan finished");
            output::print_kv("Scanned", &report.scanned.to_string());
            output::print_kv("Enqueued", &report.enqueued.to_string());
            output::print_kv("Skipped", &report.skipped.to_string());
        }
    }
    Ok(())
}
