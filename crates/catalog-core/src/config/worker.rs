//! Worker process configuration.

use serde::{Deserialize, Serialize};

/// Catalog worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Run a worker inside the manager process, talking to the job store
    /// directly instead of over HTTP.
    #[serde(default)]
    pub embedded: bool,
    /// Base URL of the manager API for remote workers.
    #[serde(default = "default_manager_url")]
    pub manager_url: String,
    /// Fixed worker identifier. Generated from host and pid when unset.
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Number of jobs processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Seconds to wait between claim attempts when the queue is empty.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Seconds between heartbeats for each in-flight job.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Attempts made to deliver a complete/fail report before giving up.
    #[serde(default = "default_report_retries")]
    pub report_retries: u32,
    /// Timeout for a single manager API request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Seconds to wait for in-flight jobs on shutdown before abandoning them.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// External media tool settings.
    #[serde(default)]
    pub tools: ToolConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            embedded: false,
            manager_url: default_manager_url(),
            worker_id: None,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            report_retries: default_report_retries(),
            request_timeout_seconds: default_request_timeout(),
            shutdown_grace_seconds: default_shutdown_grace(),
            tools: ToolConfig::default(),
        }
    }
}

/// External media tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Path to the `ffprobe` binary.
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
    /// Path to the `ffmpeg` binary.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    /// Maximum run time for a single tool invocation.
    #[serde(default = "default_tool_timeout")]
    pub timeout_seconds: u64,
    /// Height in pixels of generated proxies.
    #[serde(default = "default_proxy_height")]
    pub proxy_height: u32,
    /// Offset into the media at which the thumbnail frame is taken.
    #[serde(default = "default_thumbnail_offset")]
    pub thumbnail_offset_seconds: f64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe(),
            ffmpeg_path: default_ffmpeg(),
            timeout_seconds: default_tool_timeout(),
            proxy_height: default_proxy_height(),
            thumbnail_offset_seconds: default_thumbnail_offset(),
        }
    }
}

fn default_manager_url() -> String {
    "http://127.0.0.1:8700".to_string()
}

fn default_concurrency() -> usize {
    2
}

fn default_poll_interval() -> u64 {
    5
}

fn default_heartbeat_interval() -> u64 {
    15
}

fn default_report_retries() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    10
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_tool_timeout() -> u64 {
    3600
}

fn default_proxy_height() -> u32 {
    540
}

fn default_thumbnail_offset() -> f64 {
    1.0
}
