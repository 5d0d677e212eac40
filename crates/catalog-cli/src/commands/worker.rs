//! Worker CLI commands: run a remote worker or show queue depth.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::watch;

use catalog_api::shutdown_signal;
use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_entity::job::JobStatus;
use catalog_worker::{HttpManagerClient, JobExecutor, WorkerRunner, resolve_worker_id};

use crate::output::{self, OutputFormat};

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

impl WorkerArgs {
    /// Whether this starts a long-running worker.
    pub fn is_run(&self) -> bool {
        matches!(self.command, WorkerCommand::Run { .. })
    }
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Run a worker against a remote manager until Ctrl+C / SIGTERM
    Run {
        /// Override `worker.manager_url`
        #[arg(long)]
        manager_url: Option<String>,
        /// Override `worker.worker_id`
        #[arg(long)]
        worker_id: Option<String>,
        /// Override `worker.concurrency`
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: Option<u16>,
    },
    /// Show job counts per status
    Status,
}

/// Queue depth display row
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    /// Status
    status: String,
    /// Job count
    jobs: i64,
}

/// Execute worker commands
pub async fn execute(
    args: &WorkerArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        WorkerCommand::Run {
            manager_url,
            worker_id,
            concurrency,
        } => {
            let mut worker_config = config.worker.clone();
            if let Some(url) = manager_url {
                worker_config.manager_url = url.clone();
            }
            if let Some(id) = worker_id {
                worker_config.worker_id = Some(id.clone());
            }
            if let Some(concurrency) = concurrency {
                worker_config.concurrency = usize::from(*concurrency);
            }
            run_worker(config, worker_config).await
        }
        WorkerCommand::Status => {
            let backend = super::Backend::connect(config).await?;
            let depth = backend.manager.queue_depth().await;
            backend.close().await;
            let depth = depth?;

            match format {
                OutputFormat::Json => output::print_json(&depth),
                OutputFormat::Table => {
                    let rows: Vec<StatusRow> = JobStatus::ALL
                        .iter()
                        .map(|status| StatusRow {
                            status: status.to_string(),
                            jobs: match status {
                                JobStatus::Pending => depth.pending,
                                JobStatus::Claimed => depth.claimed,
                                JobStatus::Processing => depth.processing,
                                JobStatus::Completed => depth.completed,
                                JobStatus::Failed => depth.failed,
                            },
                        })
                        .collect();
                    output::print_list(&rows, format);
                    output::print_kv("In flight", &depth.in_flight().to_string());
                }
            }
            Ok(())
        }
    }
}

async fn run_worker(
    config: &AppConfig,
    worker_config: catalog_core::config::WorkerConfig,
) -> Result<(), AppError> {
    let worker_id = resolve_worker_id(worker_config.worker_id.as_deref());
    let client = HttpManagerClient::new(
        &worker_config.manager_url,
        Duration::from_secs(worker_config.request_timeout_seconds),
    )?;

    tracing::info!(
        "Worker '{}' connecting to manager at {}",
        worker_id,
        worker_config.manager_url
    );

    let runner = WorkerRunner::new(
        Arc::new(client),
        Arc::new(JobExecutor::from_config(&config.worker.tools)),
        worker_config,
        worker_id,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, draining in-flight jobs...");
        let _ = shutdown_tx.send(true);
    });

    runner.run(shutdown_rx).await;
    Ok(())
}
