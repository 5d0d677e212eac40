//! Proxy and thumbnail generation with `ffmpeg`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing;

use catalog_core::config::ToolConfig;
use catalog_entity::job::ProxyArtifacts;

use super::{ProxyTranscoder, ToolError, run_tool};

const PROXY_FILE: &str = "proxy.mp4";
const THUMBNAIL_FILE: &str = "thumbnail.jpg";

/// Transcodes an H.264 proxy and grabs a JPEG thumbnail.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    timeout: Duration,
    proxy_height: u32,
    thumbnail_offset_seconds: f64,
}

impl FfmpegTranscoder {
    /// Create a transcoder from the `[worker.tools]` configuration section.
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            proxy_height: config.proxy_height,
            thumbnail_offset_seconds: config.thumbnail_offset_seconds,
        }
    }

    fn scale(&self) -> String {
        format!("scale=-2:{}", self.proxy_height)
    }

    fn proxy_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let scale = self.scale();
        [
            "-y",
            "-v",
            "error",
            "-i",
            &*input,
            "-vf",
            scale.as_str(),
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-crf",
            "23",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-b:a",
            "128k",
            "-movflags",
            "+faststart",
            &*output,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn thumbnail_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let scale = self.scale();
        let offset = format!("{:.3}", self.thumbnail_offset_seconds);
        [
            "-y",
            "-v",
            "error",
            "-ss",
            offset.as_str(),
            "-i",
            &*input,
            "-frames:v",
            "1",
            "-vf",
            scale.as_str(),
            &*output,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

#[async_trait]
impl ProxyTranscoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<ProxyArtifacts, ToolError> {
        tokio::fs::create_dir_all(output_dir).await?;

        let proxy = output_dir.join(PROXY_FILE);
        run_tool(&self.program, &self.proxy_args(input, &proxy), self.timeout).await?;
        if !tokio::fs::try_exists(&proxy).await? {
            return Err(ToolError::OutputMissing(proxy));
        }

        // Thumbnails are optional; clips shorter than the offset yield none.
        let thumbnail = output_dir.join(THUMBNAIL_FILE);
        let thumbnail_path = match run_tool(
            &self.program,
            &self.thumbnail_args(input, &thumbnail),
            self.timeout,
        )
        .await
        {
            Ok(_) if tokio::fs::try_exists(&thumbnail).await.unwrap_or(false) => {
                Some(thumbnail.to_string_lossy().into_owned())
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Thumbnail generation failed for '{}': {}", input.display(), e);
                None
            }
        };

        Ok(ProxyArtifacts {
            proxy_path: proxy.to_string_lossy().into_owned(),
            thumbnail_path,
        })
    }
}
