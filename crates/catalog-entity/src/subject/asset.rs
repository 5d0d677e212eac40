//! Asset entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::SubjectStatus;

/// A media file on a volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Asset {
    /// Unique asset identifier; doubles as the job subject id.
    pub id: Uuid,
    /// Volume containing the file.
    pub volume_id: Uuid,
    /// Path relative to the volume mount.
    pub relative_path: String,
    /// Catalog processing status.
    pub catalog_status: SubjectStatus,
    /// Last failure reason.
    pub catalog_error: Option<String>,
    /// Extracted media metadata (JSON).
    pub metadata: Option<serde_json::Value>,
    /// Generated proxy path.
    pub proxy_path: Option<String>,
    /// Generated thumbnail path.
    pub thumbnail_path: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Subject returned by the eligibility scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EligibleSubject {
    /// Subject identifier.
    pub subject_id: Uuid,
    /// Input locator for the job.
    pub payload_ref: String,
}
