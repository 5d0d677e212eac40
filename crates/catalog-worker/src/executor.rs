//! Job executor: runs the media tools a job's kind calls for.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing;

use catalog_core::config::ToolConfig;
use catalog_entity::job::{JobKind, JobResult, WorkerClaim};

use crate::tools::{FfmpegTranscoder, FfprobeProbe, MediaProbe, ProxyTranscoder, ToolError};

/// Stage label reported before metadata extraction.
pub const STAGE_PROBING: &str = "probing";
/// Stage label reported before proxy generation.
pub const STAGE_TRANSCODING: &str = "transcoding";

/// Receives stage changes while a job executes.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Report entering `stage`.
    async fn stage(&self, stage: &str);
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The payload reference is absolute or escapes the source root
    #[error("invalid payload reference '{0}'")]
    InvalidPayload(String),

    /// The input disappeared or its storage became unreachable
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A media tool failed
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Runs the probe and transcoder for claimed jobs.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    probe: Arc<dyn MediaProbe>,
    transcoder: Arc<dyn ProxyTranscoder>,
}

impl JobExecutor {
    /// Create an executor over explicit tool implementations.
    pub fn new(probe: Arc<dyn MediaProbe>, transcoder: Arc<dyn ProxyTranscoder>) -> Self {
        Self { probe, transcoder }
    }

    /// Create an executor using `ffprobe` and `ffmpeg`.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(
            Arc::new(FfprobeProbe::new(config)),
            Arc::new(FfmpegTranscoder::new(config)),
        )
    }

    /// Execute a claimed job.
    pub async fn execute(
        &self,
        claim: &WorkerClaim,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, JobExecutionError> {
        let job = &claim.job;
        let input = claim
            .context
            .input_path(&job.payload_ref)
            .ok_or_else(|| JobExecutionError::InvalidPayload(job.payload_ref.clone()))?;
        let output_dir = claim.context.output_dir(job);

        tracing::info!(
            "Executing job: id={}, kind={}, attempt={}/{}, input='{}'",
            job.id,
            job.job_kind,
            job.attempts,
            job.max_attempts,
            input.display()
        );

        let result = match job.job_kind {
            JobKind::Metadata => {
                progress.stage(STAGE_PROBING).await;
                ensure_source(&input).await?;
                JobResult::Metadata {
                    metadata: self.probe.probe(&input).await?,
                }
            }
            JobKind::Proxy => {
                progress.stage(STAGE_TRANSCODING).await;
                ensure_source(&input).await?;
                JobResult::Proxy {
                    proxy: self.transcoder.transcode(&input, &output_dir).await?,
                }
            }
            JobKind::Full => {
                progress.stage(STAGE_PROBING).await;
                ensure_source(&input).await?;
                let metadata = self.probe.probe(&input).await?;

                progress.stage(STAGE_TRANSCODING).await;
                ensure_source(&input).await?;
                let proxy = self.transcoder.transcode(&input, &output_dir).await?;
                JobResult::Full { metadata, proxy }
            }
        };

        Ok(result)
    }
}

/// Check that the input is still reachable before handing it to a tool.
async fn ensure_source(input: &Path) -> Result<(), JobExecutionError> {
    match tokio::fs::metadata(input).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(JobExecutionError::SourceUnavailable(format!(
            "'{}' is not a file",
            input.display()
        ))),
        Err(e) => Err(JobExecutionError::SourceUnavailable(format!(
            "'{}': {e}",
            input.display()
        ))),
    }
}
