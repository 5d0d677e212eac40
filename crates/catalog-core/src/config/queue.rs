//! Queue, enqueuer, and reaper configuration.

use serde::{Deserialize, Serialize};

/// Job queue and enqueuer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Retry ceiling given to jobs that do not specify one.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: i32,
    /// Whether the periodic enqueue scan is registered.
    #[serde(default = "default_true")]
    pub scan_enabled: bool,
    /// Cron expression (with seconds) for the enqueue scan.
    #[serde(default = "default_scan_schedule")]
    pub scan_schedule: String,
    /// Maximum number of subjects examined per scan.
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: i64,
    /// Job kind used by the scan: `"full"`, `"proxy"` or `"metadata"`.
    #[serde(default = "default_job_kind")]
    pub default_job_kind: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: default_max_attempts(),
            scan_enabled: default_true(),
            scan_schedule: default_scan_schedule(),
            scan_batch_size: default_scan_batch_size(),
            default_job_kind: default_job_kind(),
        }
    }
}

/// Stale-job reaper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Whether the reaper runs inside the manager.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_reaper_interval")]
    pub interval_seconds: u64,
    /// A claimed/processing job untouched for this long is presumed abandoned.
    #[serde(default = "default_reaper_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_seconds: default_reaper_interval(),
            timeout_seconds: default_reaper_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> i32 {
    3
}

fn default_scan_schedule() -> String {
    "0 */5 * * * *".to_string()
}

fn default_scan_batch_size() -> i64 {
    500
}

fn default_job_kind() -> String {
    "full".to_string()
}

fn default_reaper_interval() -> u64 {
    60
}

fn default_reaper_timeout() -> u64 {
    300
}
