//! Repository for the `jobs` table.
//!
//! Uses `JobStatus` from `models::status` for all status transitions.
//! Status changes are conditional updates so that racing writers (claim
//! vs. cancel, finalize vs. anything) settle deterministically.

use sqlx::{PgConnection, PgPool};

use atelier_core::types::DbId;

use crate::models::job::{Job, JobFilter, NewJob};
use crate::models::status::{JobStatus, StatusId};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, media_type_id, status_id, priority, \
    reserved_price, reservation_id, payload, result, error_message, \
    retry_count, provider_ref, idempotency_key, \
    created_at, claimed_at, completed_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new queued job inside the admission transaction.
    pub async fn insert(conn: &mut PgConnection, input: &NewJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs \
                 (user_id, media_type_id, priority, reserved_price, \
                  reservation_id, payload, idempotency_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.user_id)
            .bind(input.media_type_id)
            .bind(input.priority)
            .bind(input.reserved_price)
            .bind(input.reservation_id)
            .bind(&input.payload)
            .bind(&input.idempotency_key)
            .fetch_one(conn)
            .await
    }

    /// Atomically claim the next queued job for a worker.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// double-claim. Admin-priority jobs come first, then FIFO by
    /// admission time.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $1, claimed_at = NOW(), updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = $2 \
                 ORDER BY priority DESC, created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a running job as succeeded with its result payload.
    ///
    /// Returns `false` if the job was not running (lost a race).
    pub async fn mark_succeeded(
        conn: &mut PgConnection,
        job_id: DbId,
        result: &serde_json::Value,
        provider_ref: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, result = $3, provider_ref = $4, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(job_id)
        .bind(JobStatus::Succeeded.id())
        .bind(result)
        .bind(provider_ref)
        .bind(JobStatus::Running.id())
        .execute(conn)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Mark a running job as failed with an error message.
    pub async fn mark_failed(
        conn: &mut PgConnection,
        job_id: DbId,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, error_message = $3, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .bind(JobStatus::Running.id())
        .execute(conn)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Cancel a job if it is still queued, returning the cancelled row.
    ///
    /// Cancellation is queue-side only: once a worker's claim has flipped
    /// the job to running, this matches zero rows and returns `None`.
    pub async fn cancel_if_queued(
        conn: &mut PgConnection,
        job_id: DbId,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(JobStatus::Cancelled.id())
            .bind(JobStatus::Queued.id())
            .fetch_optional(conn)
            .await
    }

    /// Record one more transient retry. Not a status transition.
    pub async fn increment_retry(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET retry_count = retry_count + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of non-terminal (queued or running) jobs a user has.
    ///
    /// Evaluated inside the admission transaction, after the user row
    /// lock, so concurrent submissions from one user see each other.
    pub async fn count_active_for_user(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE user_id = $1 AND status_id IN ($2, $3)",
        )
        .bind(user_id)
        .bind(JobStatus::Queued.id())
        .bind(JobStatus::Running.id())
        .fetch_one(conn)
        .await
    }

    /// Global queued-job depth, for the backpressure check.
    pub async fn count_queued(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs WHERE status_id = $1")
            .bind(JobStatus::Queued.id())
            .fetch_one(conn)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by its idempotency key.
    pub async fn find_by_idempotency_key(
        conn: &mut PgConnection,
        key: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE idempotency_key = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(key)
            .fetch_optional(conn)
            .await
    }

    /// List jobs matching a filter, newest first.
    ///
    /// A single SELECT: never blocks writers beyond row-level shared
    /// access.
    pub async fn list(pool: &PgPool, filter: &JobFilter) -> Result<Vec<Job>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = filter.offset.unwrap_or(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if filter.user_id.is_some() {
            conditions.push(format!("user_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.media_type_id.is_some() {
            conditions.push(format!("media_type_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Job>(&query);

        if let Some(user_id) = filter.user_id {
            q = q.bind(user_id);
        }
        if let Some(status_id) = filter.status_id {
            q = q.bind::<StatusId>(status_id);
        }
        if let Some(media_type_id) = filter.media_type_id {
            q = q.bind(media_type_id);
        }

        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }
}
