//! Catalog job repository.
//!
//! Every mutating statement is a single conditional `UPDATE`/`INSERT`, so
//! the ownership guard (`id + worker_id + live status`) is evaluated
//! atomically with the write. A `None` return from a guarded method means
//! the guard did not match and nothing changed.

use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use catalog_core::error::{AppError, ErrorKind};
use catalog_core::result::AppResult;
use catalog_entity::job::{CreateJob, Job, JobStatus, QueueDepth};

/// Columns that mark a job as held by a worker.
const LIVE: &str = "status IN ('claimed', 'processing')";

/// Retry-or-terminal transition shared by `fail` and `expire_stale`.
///
/// `$2` binds the failure reason.
const RELEASE_SET: &str = "\
    status = CASE WHEN attempts < max_attempts \
        THEN 'pending'::catalog_job_status ELSE 'failed'::catalog_job_status END, \
    claimed_at = CASE WHEN attempts < max_attempts THEN NULL ELSE claimed_at END, \
    worker_id = NULL, \
    stage = NULL, \
    error_message = $2, \
    updated_at = NOW()";

/// PostgreSQL-backed job store.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a job by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM catalog_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    /// Insert a pending job unconditionally.
    pub async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO catalog_jobs (id, subject_id, payload_ref, job_kind, max_attempts) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(data.subject_id)
        .bind(&data.payload_ref)
        .bind(data.job_kind)
        .bind(data.max_attempts)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job", e))
    }

    /// Insert a pending job unless the subject already has a live or
    /// pending job. Concurrent callers for one subject are serialized by a
    /// transaction-scoped advisory lock keyed on the subject id.
    pub async fn create_if_idle(&self, data: &CreateJob) -> AppResult<Option<Job>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(data.subject_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock subject", e)
            })?;

        let job = sqlx::query_as::<_, Job>(
            "INSERT INTO catalog_jobs (id, subject_id, payload_ref, job_kind, max_attempts) \
             SELECT $1, $2, $3, $4, $5 \
             WHERE NOT EXISTS ( \
                SELECT 1 FROM catalog_jobs \
                WHERE subject_id = $2 AND status IN ('pending', 'claimed', 'processing') \
             ) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(data.subject_id)
        .bind(&data.payload_ref)
        .bind(data.job_kind)
        .bind(data.max_attempts)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enqueue job", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit enqueue", e)
        })?;
        Ok(job)
    }

    /// Claim the oldest pending job for `worker_id` (SKIP LOCKED).
    pub async fn claim_next(&self, worker_id: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE catalog_jobs SET status = 'claimed', worker_id = $1, \
             attempts = attempts + 1, claimed_at = NOW(), updated_at = NOW() \
             WHERE id = ( \
                SELECT id FROM catalog_jobs \
                WHERE status = 'pending' \
                ORDER BY created_at ASC, id ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) RETURNING *",
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    /// Move an owned job to `processing` and record its stage.
    pub async fn report_progress(
        &self,
        id: Uuid,
        worker_id: &str,
        stage: Option<&str>,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(&format!(
            "UPDATE catalog_jobs SET status = 'processing', \
             stage = COALESCE($3, stage), updated_at = NOW() \
             WHERE id = $1 AND worker_id = $2 AND {LIVE} RETURNING *"
        ))
        .bind(id)
        .bind(worker_id)
        .bind(stage)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record progress", e))
    }

    /// Refresh `updated_at` of an owned job.
    pub async fn heartbeat(&self, id: Uuid, worker_id: &str) -> AppResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE catalog_jobs SET updated_at = NOW() \
             WHERE id = $1 AND worker_id = $2 AND {LIVE}"
        ))
        .bind(id)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record heartbeat", e))?;
        Ok(result.rows_affected() == 1)
    }

    /// Mark an owned job completed and store its result.
    pub async fn complete(
        &self,
        id: Uuid,
        worker_id: &str,
        result: &serde_json::Value,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(&format!(
            "UPDATE catalog_jobs SET status = 'completed', result = $3, worker_id = NULL, \
             stage = NULL, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND worker_id = $2 AND {LIVE} RETURNING *"
        ))
        .bind(id)
        .bind(worker_id)
        .bind(result)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))
    }

    /// Release an owned job: back to pending while attempts remain,
    /// otherwise failed.
    pub async fn fail(&self, id: Uuid, worker_id: &str, reason: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(&format!(
            "UPDATE catalog_jobs SET {RELEASE_SET} \
             WHERE id = $1 AND worker_id = $3 AND {LIVE} RETURNING *"
        ))
        .bind(id)
        .bind(reason)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fail job", e))
    }

    /// Fail an owned job permanently, bypassing the retry ceiling.
    pub async fn fail_permanently(
        &self,
        id: Uuid,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(&format!(
            "UPDATE catalog_jobs SET status = 'failed', worker_id = NULL, stage = NULL, \
             error_message = $3, updated_at = NOW() \
             WHERE id = $1 AND worker_id = $2 AND {LIVE} RETURNING *"
        ))
        .bind(id)
        .bind(worker_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fail job", e))
    }

    /// Release every live job whose `updated_at` is older than `timeout`.
    ///
    /// The staleness predicate is repeated on the outer statement so a row
    /// refreshed between the subquery and the update is left alone.
    pub async fn expire_stale(&self, timeout: Duration, reason: &str) -> AppResult<Vec<Job>> {
        let stale = format!("{LIVE} AND updated_at < NOW() - make_interval(secs => $1)");
        sqlx::query_as::<_, Job>(&format!(
            "UPDATE catalog_jobs SET {RELEASE_SET} \
             WHERE id IN ( \
                SELECT id FROM catalog_jobs WHERE {stale} \
                FOR UPDATE SKIP LOCKED \
             ) AND {stale} RETURNING *"
        ))
        .bind(timeout.as_secs_f64())
        .bind(reason)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to expire stale jobs", e))
    }

    /// Count jobs per status.
    pub async fn queue_depth(&self) -> AppResult<QueueDepth> {
        let rows = sqlx::query_as::<_, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM catalog_jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))?;

        let mut depth = QueueDepth::default();
        for (status, count) in rows {
            depth.set(status, count);
        }
        Ok(depth)
    }

    /// Most recent jobs for a subject, newest first.
    pub async fn find_by_subject(&self, subject_id: Uuid, limit: i64) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM catalog_jobs WHERE subject_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(subject_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))
    }
}
