//! Typed job results reported by workers.

use serde::{Deserialize, Serialize};

use catalog_core::error::AppError;

use super::status::JobKind;

/// Attributes extracted from a media file by the metadata probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Container format name (e.g. `"mov,mp4,m4a"`).
    pub container: Option<String>,
    /// Duration in seconds.
    pub duration_seconds: Option<f64>,
    /// Overall bit rate in bits per second.
    pub bit_rate: Option<i64>,
    /// Frame width of the first video stream.
    pub width: Option<i32>,
    /// Frame height of the first video stream.
    pub height: Option<i32>,
    /// Codec of the first video stream.
    pub video_codec: Option<String>,
    /// Codec of the first audio stream.
    pub audio_codec: Option<String>,
    /// Frames per second of the first video stream.
    pub frame_rate: Option<f64>,
}

/// Files generated by the proxy transcoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyArtifacts {
    /// Path of the generated proxy.
    pub proxy_path: String,
    /// Path of the generated thumbnail.
    pub thumbnail_path: Option<String>,
}

/// Result of a successful job, one variant per job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobResult {
    /// Result of a `full` job.
    Full {
        /// Extracted metadata.
        metadata: MediaMetadata,
        /// Generated files.
        proxy: ProxyArtifacts,
    },
    /// Result of a `proxy` job.
    Proxy {
        /// Generated files.
        proxy: ProxyArtifacts,
    },
    /// Result of a `metadata` job.
    Metadata {
        /// Extracted metadata.
        metadata: MediaMetadata,
    },
}

impl JobResult {
    /// The job kind this result answers.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Full { .. } => JobKind::Full,
            Self::Proxy { .. } => JobKind::Proxy,
            Self::Metadata { .. } => JobKind::Metadata,
        }
    }

    /// Extracted metadata, if this result carries any.
    pub fn metadata(&self) -> Option<&MediaMetadata> {
        match self {
            Self::Full { metadata, .. } | Self::Metadata { metadata } => Some(metadata),
            Self::Proxy { .. } => None,
        }
    }

    /// Generated files, if this result carries any.
    pub fn proxy(&self) -> Option<&ProxyArtifacts> {
        match self {
            Self::Full { proxy, .. } | Self::Proxy { proxy } => Some(proxy),
            Self::Metadata { .. } => None,
        }
    }

    /// Reject results that do not fit a job of `kind`.
    pub fn validate_for(&self, kind: JobKind) -> Result<(), AppError> {
        if self.kind() != kind {
            return Err(AppError::validation(format!(
                "Result of kind '{}' does not match job kind '{}'",
                self.kind(),
                kind
            )));
        }
        if let Some(proxy) = self.proxy() {
            if proxy.proxy_path.trim().is_empty() {
                return Err(AppError::validation("Result proxy_path must not be empty"));
            }
        }
        if let Some(metadata) = self.metadata() {
            if metadata.duration_seconds.is_some_and(|d| !d.is_finite() || d < 0.0) {
                return Err(AppError::validation(
                    "Result duration_seconds must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}
