//! Repository for `broadcasts` and `broadcast_targets`.
//!
//! Target rows are the checkpoint: the scheduler only ever attempts
//! `Pending` targets, so an interrupted broadcast resumes without
//! re-sending to anyone already delivered.

use sqlx::PgPool;

use atelier_core::types::DbId;

use crate::models::broadcast::{Broadcast, BroadcastTarget, TargetCounts};
use crate::models::status::{BroadcastStatus, TargetState};

/// Column list for `broadcasts` queries.
const COLUMNS: &str = "id, message, selector, status_id, created_at, completed_at";

/// Column list for `broadcast_targets` queries.
const TARGET_COLUMNS: &str = "id, broadcast_id, user_id, state_id, error, attempted_at";

/// Provides persistence for broadcast jobs.
pub struct BroadcastRepo;

impl BroadcastRepo {
    /// Create a pending broadcast together with its resolved target rows.
    ///
    /// One transaction, so a broadcast never exists without its targets.
    pub async fn create(
        pool: &PgPool,
        message: &str,
        selector: &serde_json::Value,
        target_user_ids: &[DbId],
    ) -> Result<Broadcast, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO broadcasts (message, selector) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        let broadcast = sqlx::query_as::<_, Broadcast>(&query)
            .bind(message)
            .bind(selector)
            .fetch_one(&mut *tx)
            .await?;

        for user_id in target_user_ids {
            sqlx::query(
                "INSERT INTO broadcast_targets (broadcast_id, user_id) \
                 VALUES ($1, $2) \
                 ON CONFLICT ON CONSTRAINT uq_broadcast_targets DO NOTHING",
            )
            .bind(broadcast.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(broadcast)
    }

    /// Oldest broadcast that still has work: pending, or in-progress after
    /// an interruption.
    pub async fn next_active(pool: &PgPool) -> Result<Option<Broadcast>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM broadcasts \
             WHERE status_id IN ($1, $2) \
             ORDER BY created_at ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Broadcast>(&query)
            .bind(BroadcastStatus::Pending.id())
            .bind(BroadcastStatus::InProgress.id())
            .fetch_optional(pool)
            .await
    }

    /// Transition a pending broadcast to in-progress.
    pub async fn mark_in_progress(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE broadcasts SET status_id = $2 WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(BroadcastStatus::InProgress.id())
        .bind(BroadcastStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Next batch of unattempted targets, in insertion order.
    pub async fn pending_targets(
        pool: &PgPool,
        broadcast_id: DbId,
        limit: i64,
    ) -> Result<Vec<BroadcastTarget>, sqlx::Error> {
        let query = format!(
            "SELECT {TARGET_COLUMNS} FROM broadcast_targets \
             WHERE broadcast_id = $1 AND state_id = $2 \
             ORDER BY id ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, BroadcastTarget>(&query)
            .bind(broadcast_id)
            .bind(TargetState::Pending.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Record one target's delivery outcome.
    pub async fn record_outcome(
        pool: &PgPool,
        target_id: DbId,
        delivered: bool,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let state = if delivered {
            TargetState::Delivered
        } else {
            TargetState::Failed
        };
        sqlx::query(
            "UPDATE broadcast_targets \
             SET state_id = $2, error = $3, attempted_at = NOW() \
             WHERE id = $1",
        )
        .bind(target_id)
        .bind(state.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Per-state target counts for finalization.
    pub async fn target_counts(
        pool: &PgPool,
        broadcast_id: DbId,
    ) -> Result<TargetCounts, sqlx::Error> {
        sqlx::query_as::<_, TargetCounts>(
            "SELECT \
                 COUNT(*) FILTER (WHERE state_id = $2) AS pending, \
                 COUNT(*) FILTER (WHERE state_id = $3) AS delivered, \
                 COUNT(*) FILTER (WHERE state_id = $4) AS failed \
             FROM broadcast_targets WHERE broadcast_id = $1",
        )
        .bind(broadcast_id)
        .bind(TargetState::Pending.id())
        .bind(TargetState::Delivered.id())
        .bind(TargetState::Failed.id())
        .fetch_one(pool)
        .await
    }

    /// Finalize an in-progress broadcast as completed or partially failed.
    pub async fn finalize(
        pool: &PgPool,
        id: DbId,
        status: BroadcastStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE broadcasts \
             SET status_id = $2, completed_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(status.id())
        .bind(BroadcastStatus::InProgress.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a broadcast by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Broadcast>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM broadcasts WHERE id = $1");
        sqlx::query_as::<_, Broadcast>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The retrievable list of failed targets for a broadcast.
    pub async fn failed_targets(
        pool: &PgPool,
        broadcast_id: DbId,
    ) -> Result<Vec<BroadcastTarget>, sqlx::Error> {
        let query = format!(
            "SELECT {TARGET_COLUMNS} FROM broadcast_targets \
             WHERE broadcast_id = $1 AND state_id = $2 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, BroadcastTarget>(&query)
            .bind(broadcast_id)
            .bind(TargetState::Failed.id())
            .fetch_all(pool)
            .await
    }
}
