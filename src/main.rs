//! Catalog Manager: job queue for media proxy and metadata generation.
//!
//! Main entry point that wires all crates together and starts the manager.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use catalog_api::{AppState, build_app, serve, shutdown_signal};
use catalog_core::config::{AppConfig, LogFormat, LoggingConfig};
use catalog_core::error::{AppError, ErrorKind};
use catalog_database::DatabasePool;
use catalog_queue::{CatalogScheduler, Enqueuer, JobManager, StaleJobReaper};
use catalog_worker::{JobExecutor, LocalManagerClient, WorkerRunner, resolve_worker_id};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    if let Err(e) = run(config).await {
        tracing::error!("Manager error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("CATALOG_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let env = std::env::var("CATALOG_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main manager run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting catalog manager v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;
    catalog_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Job manager and enqueuer ─────────────────────────
    let assets = Arc::new(db.assets());
    let manager = Arc::new(JobManager::new(Arc::new(db.jobs()), assets.clone()));
    let enqueuer = Arc::new(Enqueuer::new(
        Arc::clone(&manager),
        assets,
        &config.queue,
    )?);

    // ── Step 3: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 4: Stale-job reaper ─────────────────────────────────
    let reaper_handle = if config.reaper.enabled {
        let reaper = StaleJobReaper::new(Arc::clone(&manager), &config.reaper);
        let cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move { reaper.run(cancel).await }))
    } else {
        tracing::info!("Stale-job reaper disabled");
        None
    };

    // ── Step 5: Scan scheduler ───────────────────────────────────
    let mut scheduler = if config.queue.scan_enabled {
        let scheduler = CatalogScheduler::new(Arc::clone(&enqueuer)).await?;
        scheduler.register_scan(&config.queue.scan_schedule).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Scheduled catalog scans disabled");
        None
    };

    // ── Step 6: Embedded worker ──────────────────────────────────
    let worker_handle = if config.worker.embedded {
        let worker_id = resolve_worker_id(config.worker.worker_id.as_deref());
        let runner = WorkerRunner::new(
            Arc::new(LocalManagerClient::new(Arc::clone(&manager))),
            Arc::new(JobExecutor::from_config(&config.worker.tools)),
            config.worker.clone(),
            worker_id,
        );
        let cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move { runner.run(cancel).await }))
    } else {
        tracing::info!("Embedded worker disabled");
        None
    };

    // ── Step 7: HTTP server ──────────────────────────────────────
    let state = AppState::new(manager, enqueuer).with_database(db.clone());
    let app = build_app(state, &config.server);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Internal, format!("Failed to bind {}", addr), e)
    })?;

    serve(listener, app, async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    })
    .await?;

    // ── Step 8: Wait for background tasks ────────────────────────
    tracing::info!("Waiting for background tasks to complete...");

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Scheduler shutdown failed: {}", e);
        }
    }

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    if let Some(handle) = worker_handle {
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Embedded worker did not stop within {:?}", grace);
        }
    }
    if let Some(handle) = reaper_handle {
        let _ = tokio::time::timeout(grace, handle).await;
    }

    db.close().await;
    tracing::info!("Catalog manager shut down gracefully");
    Ok(())
}
