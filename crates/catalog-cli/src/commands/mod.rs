//! CLI command definitions and dispatch.

pub mod enqueue;
pub mod job;
pub mod migrate;
pub mod reap;
pub mod scan;
pub mod worker;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use catalog_core::config::AppConfig;
use catalog_core::error::AppError;
use catalog_database::{AssetRepository, DatabasePool};
use catalog_queue::JobManager;

use crate::output::OutputFormat;

/// Catalog proxy and metadata job queue
#[derive(Debug, Parser)]
#[command(name = "catalog-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CATALOG_CONFIG", default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay (`config/{env}.toml`)
    #[arg(long, env = "CATALOG_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Run a worker or inspect the queue
    Worker(worker::WorkerArgs),
    /// Enqueue a job for one subject
    Enqueue(enqueue::EnqueueArgs),
    /// Run one eligibility scan
    Scan,
    /// Run one stale-job sweep
    Reap(reap::ReapArgs),
    /// Inspect jobs
    Job(job::JobArgs),
}

impl Cli {
    /// Worker processes log at info; one-shot commands stay quiet.
    pub fn default_log_level(&self) -> &'static str {
        match &self.command {
            Commands::Worker(args) if args.is_run() => "info",
            _ => "warn",
        }
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load(&self.config, &self.env)?;

        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Worker(args) => worker::execute(args, &config, self.format).await,
            Commands::Enqueue(args) => enqueue::execute(args, &config, self.format).await,
            Commands::Scan => scan::execute(&config, self.format).await,
            Commands::Reap(args) => reap::execute(args, &config).await,
            Commands::Job(args) => job::execute(args, &config, self.format).await,
        }
    }
}

/// Database-backed queue handles shared by the one-shot commands.
pub struct Backend {
    /// Connection pool; closed by [`Backend::close`].
    pub db: DatabasePool,
    /// Job manager over the PostgreSQL store.
    pub manager: Arc<JobManager>,
    /// Asset repository, used as the subject catalog.
    pub assets: Arc<AssetRepository>,
}

impl Backend {
    /// Connect to the database and build the job manager.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let db = DatabasePool::connect(&config.database).await?;
        let assets = Arc::new(db.assets());
        let manager = Arc::new(JobManager::new(Arc::new(db.jobs()), assets.clone()));
        Ok(Self {
            db,
            manager,
            assets,
        })
    }

    /// Close the pool.
    pub async fn close(self) {
        self.db.close().await;
    }
}
