//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod logging;
pub mod queue;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::queue::{QueueConfig, ReaperConfig};
pub use self::worker::{ToolConfig, WorkerConfig};

use crate::error::AppError;

/// Minimum ratio between the reaper timeout and the worker heartbeat
/// interval below which a slow worker risks being reaped while alive.
pub const REAPER_SAFETY_FACTOR: u64 = 6;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings. Remote workers leave this unset.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Queue and enqueuer settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Stale-job reaper settings.
    #[serde(default)]
    pub reaper: ReaperConfig,
    /// Worker process settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Database connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. Required by the manager and database
    /// commands only.
    #[serde(default)]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Idle connection timeout in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the file at `path` with an environment-specific overlay
    /// (`config/{env}.toml`) and environment variables prefixed with
    /// `CATALOG_` (nested keys separated by `__`).
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CATALOG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-section constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        let heartbeat = self.worker.heartbeat_interval_seconds;
        let timeout = self.reaper.timeout_seconds;

        if heartbeat == 0 {
            return Err(AppError::configuration(
                "worker.heartbeat_interval_seconds must be greater than zero",
            ));
        }
        if timeout <= heartbeat {
            return Err(AppError::configuration(format!(
                "reaper.timeout_seconds ({timeout}) must exceed \
                 worker.heartbeat_interval_seconds ({heartbeat})"
            )));
        }
        if timeout < heartbeat.saturating_mul(REAPER_SAFETY_FACTOR) {
            tracing::warn!(
                timeout_seconds = timeout,
                heartbeat_interval_seconds = heartbeat,
                "Reaper timeout is less than {}x the heartbeat interval; \
                 slow workers may be reaped while still alive",
                REAPER_SAFETY_FACTOR
            );
        }
        if self.worker.poll_interval_seconds == 0 {
            return Err(AppError::configuration(
                "worker.poll_interval_seconds must be greater than zero",
            ));
        }
        if self.worker.concurrency == 0 {
            return Err(AppError::configuration(
                "worker.concurrency must be at least 1",
            ));
        }
        if self.queue.default_max_attempts < 1 {
            return Err(AppError::configuration(
                "queue.default_max_attempts must be at least 1",
            ));
        }

        Ok(())
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}
