//! Manual enqueue of a single subject.

use std::sync::Arc;

use clap::Args;
use uuid::Uuid;

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_entity::job::{Job, JobKind};
use catalog_queue::Enqueuer;

use crate::commands::job::JobRow;
use crate::output::{self, OutputFormat};

/// Arguments for the enqueue command
#[derive(Debug, Args)]
pub struct EnqueueArgs {
    /// Subject (asset) ID
    pub subject: Uuid,

    /// Input path relative to the volume; defaults to the asset's path
    #[arg(long)]
    pub payload: Option<String>,

    /// Job kind: full, proxy, or metadata; defaults to `queue.default_job_kind`
    #[arg(long)]
    pub kind: Option<JobKind>,

    /// Retry ceiling; defaults to `queue.default_max_attempts`
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..=20))]
    pub max_attempts: Option<i32>,
}

/// Enqueue a job unless the subject already has an active one
pub async fn execute(
    args: &EnqueueArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let backend = super::Backend::connect(config).await?;
    let outcome = enqueue(args, config, &backend).await;
    backend.close().await;

    match outcome? {
        Some(job) => match format {
            OutputFormat::Json => output::print_json(&job),
            OutputFormat::Table => {
                output::print_success(&format!("Job {} enqueued", job.id));
                output::print_list(&[JobRow::from(&job)], format);
            }
        },
        None => output::print_warning(&format!(
            "Subject {} already has an active job; nothing enqueued",
            args.subject
        )),
    }
    Ok(())
}

async fn enqueue(
    args: &EnqueueArgs,
    config: &AppConfig,
    backend: &super::Backend,
) -> Result<Option<Job>, AppError> {
    let payload = match &args.payload {
        Some(payload) if !payload.trim().is_empty() => payload.clone(),
        Some(_) => return Err(AppError::validation("--payload must not be empty")),
        None => backend
            .assets
            .find_by_id(args.subject)
            .await?
            .map(|asset| asset.relative_path)
            .ok_or_else(|| AppError::not_found(format!("Asset {} not found", args.subject)))?,
    };

    let enqueuer = Enqueuer::new(
        Arc::clone(&backend.manager),
        backend.assets.clone(),
        &config.queue,
    )?;
    enqueuer
        .enqueue_subject(args.subject, &payload, args.kind, args.max_attempts)
        .await
}
