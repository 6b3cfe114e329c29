//! Rate-limited broadcast fan-out.
//!
//! Runs on its own tokio task, never on dispatcher workers, so broadcast
//! load cannot starve generation jobs. Progress is checkpointed per
//! target row: an interrupted broadcast resumes from the first
//! unattempted target and never re-sends to a delivered one.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use atelier_core::error::{CoreError, CoreResult};
use atelier_core::types::DbId;
use atelier_db::models::broadcast::{Broadcast, BroadcastSelector, BroadcastTarget};
use atelier_db::models::status::BroadcastStatus;
use atelier_db::repositories::{BroadcastRepo, UserRepo};
use atelier_db::DbPool;

use crate::config::EngineConfig;
use crate::db_error;
use crate::sink::BroadcastSink;

/// Schedules and executes administrator broadcasts.
#[derive(Clone)]
pub struct BroadcastScheduler {
    pool: DbPool,
    sink: Arc<dyn BroadcastSink>,
    config: EngineConfig,
}

impl BroadcastScheduler {
    pub fn new(pool: DbPool, sink: Arc<dyn BroadcastSink>, config: EngineConfig) -> Self {
        Self { pool, sink, config }
    }

    /// Resolve the selector and store a pending broadcast.
    pub async fn schedule(
        &self,
        message: &str,
        selector: BroadcastSelector,
    ) -> CoreResult<Broadcast> {
        if message.is_empty() {
            return Err(CoreError::Validation(
                "Broadcast message must not be empty".to_string(),
            ));
        }

        let target_ids: Vec<DbId> = match &selector {
            BroadcastSelector::All => UserRepo::all_unbanned_ids(&self.pool)
                .await
                .map_err(db_error)?,
            BroadcastSelector::Users { ids } => ids.clone(),
        };

        let selector_json = serde_json::to_value(&selector)
            .map_err(|e| CoreError::Internal(format!("Selector serialization failed: {e}")))?;

        let broadcast = BroadcastRepo::create(&self.pool, message, &selector_json, &target_ids)
            .await
            .map_err(db_error)?;

        tracing::info!(
            broadcast_id = broadcast.id,
            targets = target_ids.len(),
            "Broadcast scheduled",
        );
        Ok(broadcast)
    }

    /// Run the delivery loop until cancelled. One batch per tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.broadcast_interval);
        tracing::info!(
            batch_size = self.config.broadcast_batch_size,
            interval_ms = self.config.broadcast_interval.as_millis() as u64,
            "Broadcast scheduler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Broadcast scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_tick().await {
                        tracing::error!(error = %e, "Broadcast tick failed");
                    }
                }
            }
        }
    }

    /// Deliver one batch of the oldest active broadcast.
    ///
    /// Returns `Ok(false)` when there is no broadcast with pending work.
    /// Exposed so tests can drive delivery deterministically.
    pub async fn run_tick(&self) -> CoreResult<bool> {
        let Some(broadcast) = BroadcastRepo::next_active(&self.pool).await.map_err(db_error)?
        else {
            return Ok(false);
        };

        if broadcast.status_id == BroadcastStatus::Pending.id() {
            BroadcastRepo::mark_in_progress(&self.pool, broadcast.id)
                .await
                .map_err(db_error)?;
        }

        let targets = BroadcastRepo::pending_targets(
            &self.pool,
            broadcast.id,
            self.config.broadcast_batch_size,
        )
        .await
        .map_err(db_error)?;

        if targets.is_empty() {
            self.finalize(&broadcast).await?;
            return Ok(true);
        }

        for target in &targets {
            self.deliver_to(&broadcast, target).await?;
        }
        Ok(true)
    }

    /// Attempt one target and record the outcome.
    async fn deliver_to(&self, broadcast: &Broadcast, target: &BroadcastTarget) -> CoreResult<()> {
        let user = UserRepo::find_by_id(&self.pool, target.user_id)
            .await
            .map_err(db_error)?;

        let outcome = match user {
            Some(user) => self.sink.deliver(&user, &broadcast.message).await,
            None => Err(format!("User {} not found", target.user_id)),
        };

        match outcome {
            Ok(()) => {
                BroadcastRepo::record_outcome(&self.pool, target.id, true, None)
                    .await
                    .map_err(db_error)?;
            }
            Err(reason) => {
                tracing::warn!(
                    broadcast_id = broadcast.id,
                    user_id = target.user_id,
                    error = %reason,
                    "Broadcast delivery failed",
                );
                BroadcastRepo::record_outcome(&self.pool, target.id, false, Some(&reason))
                    .await
                    .map_err(db_error)?;
            }
        }
        Ok(())
    }

    /// Settle a broadcast whose targets are all attempted.
    async fn finalize(&self, broadcast: &Broadcast) -> CoreResult<()> {
        let counts = BroadcastRepo::target_counts(&self.pool, broadcast.id)
            .await
            .map_err(db_error)?;

        let status = if counts.failed == 0 {
            BroadcastStatus::Completed
        } else {
            BroadcastStatus::PartiallyFailed
        };

        BroadcastRepo::finalize(&self.pool, broadcast.id, status)
            .await
            .map_err(db_error)?;

        tracing::info!(
            broadcast_id = broadcast.id,
            delivered = counts.delivered,
            failed = counts.failed,
            "Broadcast finished",
        );
        Ok(())
    }

    /// Broadcast status plus its failed targets, for the admin endpoint.
    pub async fn status(
        &self,
        broadcast_id: DbId,
    ) -> CoreResult<(Broadcast, Vec<BroadcastTarget>)> {
        let broadcast = BroadcastRepo::find_by_id(&self.pool, broadcast_id)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound {
                entity: "Broadcast",
                id: broadcast_id,
            })?;
        let failed = BroadcastRepo::failed_targets(&self.pool, broadcast_id)
            .await
            .map_err(db_error)?;
        Ok((broadcast, failed))
    }
}
