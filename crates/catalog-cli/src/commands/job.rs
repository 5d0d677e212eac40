//! Job inspection commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_entity::job::Job;

use crate::output::{self, OutputFormat};

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Job subcommand
    #[command(subcommand)]
    pub command: JobCommand,
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Show one job
    Show {
        /// Job ID
        id: Uuid,
    },
    /// List the most recent jobs for a subject
    List {
        /// Subject ID
        #[arg(long)]
        subject: Uuid,
        /// Maximum number of jobs
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

/// Job display row
#[derive(Debug, Serialize, Tabled)]
pub struct JobRow {
    /// Job ID
    id: String,
    /// Subject ID
    subject: String,
    /// Kind
    kind: String,
    /// Status
    status: String,
    /// Attempts used / allowed
    attempts: String,
    /// Owning worker
    worker: String,
    /// Stage
    stage: String,
    /// Last error
    error: String,
    /// Last update
    updated: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            subject: job.subject_id.to_string(),
            kind: job.job_kind.to_string(),
            status: job.status.to_string(),
            attempts: format!("{}/{}", job.attempts, job.max_attempts),
            worker: job.worker_id.clone().unwrap_or_else(|| "-".to_string()),
            stage: job.stage.clone().unwrap_or_else(|| "-".to_string()),
            error: job.error_message.clone().unwrap_or_else(|| "-".to_string()),
            updated: job.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute job commands
pub async fn execute(
    args: &JobArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let backend = super::Backend::connect(config).await?;

    let outcome = match &args.command {
        JobCommand::Show { id } => backend.manager.find(*id).await.and_then(|job| {
            let job = job.ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
            match format {
                OutputFormat::Json => output::print_json(&job),
                OutputFormat::Table => output::print_list(&[JobRow::from(&job)], format),
            }
            Ok(())
        }),
        JobCommand::List { subject, limit } => backend
            .db
            .jobs()
            .find_by_subject(*subject, *limit)
            .await
            .map(|jobs| match format {
                OutputFormat::Json => output::print_json(&jobs),
                OutputFormat::Table => {
                    let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
                    output::print_list(&rows, format);
                }
            }),
    };

    backend.close().await;
    outcome
}
