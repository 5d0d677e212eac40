//! One-shot stale-job sweep.

use std::sync::Arc;

use clap::Args;

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_queue::StaleJobReaper;

use crate::output;

/// Arguments for the reap command
#[derive(Debug, Args)]
pub struct ReapArgs {
    /// Override `reaper.timeout_seconds`
    #[arg(long)]
    pub timeout_seconds: Option<u64>,
}

/// Release jobs whose owner stopped heartbeating
pub async fn execute(args: &ReapArgs, config: &AppConfig) -> Result<(), AppError> {
    let mut reaper_config = config.reaper.clone();
    if let Some(timeout) = args.timeout_seconds {
        if timeout == 0 {
            return Err(AppError::validation("--timeout-seconds must be positive"));
        }
        reaper_config.timeout_seconds = timeout;
    }

    let backend = super::Backend::connect(config).await?;
    let reaper = StaleJobReaper::new(Arc::clone(&backend.manager), &reaper_config);
    let expired = reaper.sweep_once().await?;
    backend.close().await;

    output::print_success(&format!(
        "Reclaimed {} stale job(s) (timeout {}s)",
        expired, reaper_config.timeout_seconds
    ));
    Ok(())
}
