//! Asset repository: subject resolution and catalog status writes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use catalog_core::error::{AppError, ErrorKind};
use catalog_core::result::AppResult;
use catalog_entity::job::{ExecutionContext, JobResult};
use catalog_entity::subject::{Asset, EligibleSubject, SubjectStatus};

/// Repository for catalogued assets and their volumes.
#[derive(Debug, Clone)]
pub struct AssetRepository {
    pool: PgPool,
}

impl AssetRepository {
    /// Create a new asset repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an asset by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Asset>> {
        sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find asset", e))
    }

    /// Storage roots for an asset on an online volume.
    ///
    /// `None` when the asset is unknown or its volume is offline.
    pub async fn resolve_context(&self, id: Uuid) -> AppResult<Option<ExecutionContext>> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT v.mount_path, v.proxy_root FROM assets a \
             JOIN volumes v ON v.id = a.volume_id \
             WHERE a.id = $1 AND v.online",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to resolve asset", e))?;

        Ok(row.map(|(source_root, output_root)| ExecutionContext {
            source_root,
            output_root,
        }))
    }

    /// Overwrite the denormalized catalog status.
    ///
    /// Skipped when a write stamped later than `as_of` already landed.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: SubjectStatus,
        error: Option<&str>,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE assets SET catalog_status = $2, catalog_error = $3, \
             catalog_synced_at = $4, updated_at = NOW() \
             WHERE id = $1 AND (catalog_synced_at IS NULL OR catalog_synced_at <= $4)",
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .bind(as_of)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update catalog status", e)
        })?;
        Ok(())
    }

    /// Merge a job result into the asset and mark it ready.
    pub async fn apply_result(
        &self,
        id: Uuid,
        result: &JobResult,
        as_of: DateTime<Utc>,
    ) -> AppResult<()> {
        let metadata = result.metadata().map(serde_json::to_value).transpose()?;
        let proxy = result.proxy();

        sqlx::query(
            "UPDATE assets SET \
             metadata = COALESCE($2, metadata), \
             proxy_path = COALESCE($3, proxy_path), \
             thumbnail_path = COALESCE($4, thumbnail_path), \
             catalog_status = 'ready', catalog_error = NULL, \
             catalog_synced_at = $5, updated_at = NOW() \
             WHERE id = $1 AND (catalog_synced_at IS NULL OR catalog_synced_at <= $5)",
        )
        .bind(id)
        .bind(metadata)
        .bind(proxy.map(|p| p.proxy_path.as_str()))
        .bind(proxy.and_then(|p| p.thumbnail_path.as_deref()))
        .bind(as_of)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to apply job result", e))?;
        Ok(())
    }

    /// Never-queued assets on online volumes, oldest first.
    pub async fn find_eligible(&self, limit: i64) -> AppResult<Vec<EligibleSubject>> {
        sqlx::query_as::<_, EligibleSubject>(
            "SELECT a.id AS subject_id, a.relative_path AS payload_ref FROM assets a \
             JOIN volumes v ON v.id = a.volume_id \
             WHERE a.catalog_status = 'none' AND v.online \
             ORDER BY a.created_at ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list eligible assets", e)
        })
    }
}
