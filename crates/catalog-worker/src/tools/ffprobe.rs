//! Metadata extraction with `ffprobe`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use catalog_core::config::ToolConfig;
use catalog_entity::job::MediaMetadata;

use super::{MediaProbe, ToolError, run_tool};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// Runs `ffprobe -print_format json` and maps its output.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
    timeout: Duration,
}

impl FfprobeProbe {
    /// Create a probe from the `[worker.tools]` configuration section.
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            program: config.ffprobe_path.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn args(input: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            input.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, input: &Path) -> Result<MediaMetadata, ToolError> {
        let stdout = run_tool(&self.program, &Self::args(input), self.timeout).await?;
        parse_probe_output(&stdout)
    }
}

/// Parse `ffprobe` JSON output into [`MediaMetadata`].
pub fn parse_probe_output(stdout: &[u8]) -> Result<MediaMetadata, ToolError> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| ToolError::InvalidOutput {
            tool: "ffprobe".to_string(),
            reason: e.to_string(),
        })?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));
    let format = output.format.as_ref();

    Ok(MediaMetadata {
        container: format.and_then(|f| f.format_name.clone()),
        duration_seconds: format
            .and_then(|f| f.duration.as_deref())
            .and_then(|d| d.parse().ok()),
        bit_rate: format
            .and_then(|f| f.bit_rate.as_deref())
            .and_then(|b| b.parse().ok()),
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        video_codec: video.and_then(|v| v.codec_name.clone()),
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
        frame_rate: video.and_then(|v| {
            v.avg_frame_rate
                .as_deref()
                .and_then(parse_rate)
                .or_else(|| v.r_frame_rate.as_deref().and_then(parse_rate))
        }),
    })
}

/// Parse an `ffprobe` rational such as `"30000/1001"`.
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/').unwrap_or((rate, "1"));
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    (den != 0.0 && num > 0.0).then(|| num / den)
}
