//! External media tools.
//!
//! Tools run as child processes with `kill_on_drop`, so dropping the
//! future that awaits one (timeout or job cancellation) kills the process.

pub mod ffmpeg;
pub mod ffprobe;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing;

use catalog_entity::job::{MediaMetadata, ProxyArtifacts};

pub use ffmpeg::FfmpegTranscoder;
pub use ffprobe::FfprobeProbe;

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool binary was not found
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The tool ran longer than allowed
    #[error("{tool} timed out after {seconds} seconds")]
    Timeout {
        /// Tool name
        tool: String,
        /// Timeout that was exceeded
        seconds: u64,
    },

    /// The tool exited with a non-zero code
    #[error("{tool} failed with exit code {code}: {stderr}")]
    ProcessFailed {
        /// Tool name
        tool: String,
        /// Exit code, -1 when killed by a signal
        code: i32,
        /// Tail of standard error
        stderr: String,
    },

    /// The tool produced output that could not be interpreted
    #[error("Unreadable {tool} output: {reason}")]
    InvalidOutput {
        /// Tool name
        tool: String,
        /// What was wrong
        reason: String,
    },

    /// Expected output file was not created
    #[error("Expected output file not created: {0}")]
    OutputMissing(PathBuf),

    /// IO error around the tool invocation
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts [`MediaMetadata`] from an input file.
#[async_trait]
pub trait MediaProbe: Send + Sync + std::fmt::Debug {
    /// Probe `input`.
    async fn probe(&self, input: &Path) -> Result<MediaMetadata, ToolError>;
}

/// Generates a proxy (and optionally a thumbnail) for an input file.
#[async_trait]
pub trait ProxyTranscoder: Send + Sync + std::fmt::Debug {
    /// Write artifacts for `input` into `output_dir`.
    async fn transcode(&self, input: &Path, output_dir: &Path)
    -> Result<ProxyArtifacts, ToolError>;
}

/// Maximum number of stderr characters kept in errors.
const STDERR_LIMIT: usize = 2000;

/// Run `program` with `args`, returning its stdout on success.
pub async fn run_tool(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<Vec<u8>, ToolError> {
    let start = Instant::now();
    tracing::debug!("Running tool: program='{}', args={:?}", program, args);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::NotFound(program.to_string()));
        }
        Ok(Err(e)) => return Err(ToolError::Io(e)),
        Err(_) => {
            tracing::warn!(
                "Tool timed out: program='{}', timeout={}s",
                program,
                timeout.as_secs()
            );
            return Err(ToolError::Timeout {
                tool: program.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .chars()
            .rev()
            .take(STDERR_LIMIT)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return Err(ToolError::ProcessFailed {
            tool: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: tail.trim().to_string(),
        });
    }

    tracing::debug!(
        "Tool finished: program='{}', duration={}ms",
        program,
        start.elapsed().as_millis()
    );
    Ok(output.stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_run_tool_captures_stdout() {
        let out = run_tool("sh", &sh("printf hello"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_run_tool_reports_exit_code() {
        let err = run_tool("sh", &sh("echo bad input >&2; exit 3"), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ToolError::ProcessFailed { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "bad input");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_tool_missing_binary() {
        let err = run_tool("definitely-not-a-real-tool", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let script = format!("sleep 1; touch {}", marker.display());

        let err = run_tool("sh", &sh(&script), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }
}
