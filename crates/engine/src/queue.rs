//! Admission control: the path from a submission request to a queued job.
//!
//! Reservation and admission are atomic as a unit. Every check after the
//! price lookup runs inside one transaction holding the user row lock, so
//! a failed admission rolls back completely: no observer ever sees a
//! reservation without its job, and no dangling hold survives an error.

use atelier_core::error::{CoreError, CoreResult};
use atelier_core::ledger::{self, LedgerReason};
use atelier_core::media::MediaType;
use atelier_core::scheduling::{PRIORITY_ADMIN, PRIORITY_NORMAL};
use atelier_core::types::DbId;
use atelier_db::models::job::{Job, JobFilter, NewJob};
use atelier_db::models::status::{JobStatus, StatusId};
use atelier_db::repositories::{JobRepo, LedgerRepo, PriceRepo, UserRepo};
use atelier_db::DbPool;

use crate::config::EngineConfig;
use crate::db_error;

/// A submission request from the transport.
#[derive(Debug, Clone)]
pub struct Submission {
    pub user_id: DbId,
    pub media_type: MediaType,
    pub payload: serde_json::Value,
    /// Resubmissions with the same key return the original job untouched.
    pub idempotency_key: Option<String>,
}

/// Admission-controlled access to the job queue.
#[derive(Clone)]
pub struct QueueService {
    pool: DbPool,
    config: EngineConfig,
}

impl QueueService {
    pub fn new(pool: DbPool, config: EngineConfig) -> Self {
        Self { pool, config }
    }

    /// Submit a job on the normal path: ban check, price lookup, reserve,
    /// per-user concurrency check, global depth check, enqueue FIFO.
    pub async fn submit(&self, submission: Submission) -> CoreResult<Job> {
        self.admit(submission, PRIORITY_NORMAL, false).await
    }

    /// Administrator override: bypasses the concurrency and depth checks
    /// and jumps the FIFO order. Credit is still reserved.
    pub async fn submit_admin(&self, submission: Submission) -> CoreResult<Job> {
        self.admit(submission, PRIORITY_ADMIN, true).await
    }

    async fn admit(
        &self,
        submission: Submission,
        priority: i32,
        bypass_limits: bool,
    ) -> CoreResult<Job> {
        let user_id = submission.user_id;

        // Ban check first: banned users get no further processing.
        let banned = UserRepo::is_banned(&self.pool, user_id)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })?;
        if banned {
            return Err(CoreError::UserBanned);
        }

        // Price is frozen here; later edits do not touch this job.
        let price = PriceRepo::get(&self.pool, submission.media_type.id())
            .await
            .map_err(db_error)?
            .ok_or_else(|| CoreError::UnknownType(submission.media_type.code().to_string()))?;

        ledger::validate_reserve_amount(price.price)?;

        // Everything below is atomic. An early error return drops the
        // transaction, rolling back the reservation with it.
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        if let Some(ref key) = submission.idempotency_key {
            if let Some(existing) = JobRepo::find_by_idempotency_key(&mut *tx, key)
                .await
                .map_err(db_error)?
            {
                tracing::info!(
                    job_id = existing.id,
                    idempotency_key = %key,
                    "Submission matched existing job, nothing charged",
                );
                return Ok(existing);
            }
        }

        // The user row lock serializes concurrent reserves for this user:
        // two requests whose sum exceeds the balance cannot both pass the
        // check below.
        let user = UserRepo::lock_for_update(&mut *tx, user_id)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })?;

        if user.balance < price.price {
            return Err(CoreError::InsufficientCredit {
                required: price.price,
                available: user.balance,
            });
        }

        if !bypass_limits {
            let active = JobRepo::count_active_for_user(&mut *tx, user_id)
                .await
                .map_err(db_error)?;
            if active >= self.config.user_active_job_limit {
                return Err(CoreError::ConcurrencyLimitExceeded {
                    limit: self.config.user_active_job_limit,
                });
            }

            let depth = JobRepo::count_queued(&mut *tx).await.map_err(db_error)?;
            if depth >= self.config.queue_depth_limit {
                return Err(CoreError::QueueFull);
            }
        }

        let reservation = LedgerRepo::create_reservation(&mut *tx, user_id, price.price)
            .await
            .map_err(db_error)?;

        let job = JobRepo::insert(
            &mut *tx,
            &NewJob {
                user_id,
                media_type_id: submission.media_type.id(),
                priority,
                reserved_price: price.price,
                reservation_id: reservation.id,
                payload: submission.payload,
                idempotency_key: submission.idempotency_key,
            },
        )
        .await
        .map_err(db_error)?;

        LedgerRepo::attach_job(&mut *tx, reservation.id, job.id)
            .await
            .map_err(db_error)?;

        LedgerRepo::apply_delta(
            &mut *tx,
            user_id,
            -price.price,
            LedgerReason::Reserve,
            Some(job.id),
        )
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        tracing::info!(
            job_id = job.id,
            user_id,
            media_type = %submission.media_type,
            price = price.price,
            priority,
            "Job admitted",
        );
        Ok(job)
    }

    /// Cancel a queued job and refund its reservation.
    ///
    /// Allowed only while the job is queued. The conditional update races
    /// cleanly against a worker's claim: whichever lands first wins, the
    /// loser observes the new state.
    pub async fn cancel(&self, job_id: DbId) -> CoreResult<Job> {
        let job = JobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound {
                entity: "Job",
                id: job_id,
            })?;

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Lock ordering across the engine is user row first, then job row.
        UserRepo::lock_for_update(&mut *tx, job.user_id)
            .await
            .map_err(db_error)?;

        let Some(cancelled) = JobRepo::cancel_if_queued(&mut *tx, job_id)
            .await
            .map_err(db_error)?
        else {
            drop(tx);
            let current = JobRepo::find_by_id(&self.pool, job_id)
                .await
                .map_err(db_error)?
                .ok_or(CoreError::NotFound {
                    entity: "Job",
                    id: job_id,
                })?;
            let status = status_label(current.status_id);
            return Err(CoreError::InvalidState(format!(
                "Job {job_id} is {status}, only queued jobs can be cancelled"
            )));
        };

        if LedgerRepo::refund(&mut *tx, cancelled.reservation_id)
            .await
            .map_err(db_error)?
            .is_none()
        {
            // The reservation was already resolved; the exactly-once
            // guard turns this into a no-op rather than a double refund.
            tracing::warn!(
                job_id,
                reservation_id = cancelled.reservation_id,
                "Cancelled job's reservation was already resolved",
            );
        }

        tx.commit().await.map_err(db_error)?;

        tracing::info!(job_id, "Job cancelled and reservation refunded");
        Ok(cancelled)
    }

    /// Read-only snapshot of jobs matching a filter.
    pub async fn list(&self, filter: &JobFilter) -> CoreResult<Vec<Job>> {
        JobRepo::list(&self.pool, filter).await.map_err(db_error)
    }

    /// Look up a single job.
    pub async fn get(&self, job_id: DbId) -> CoreResult<Job> {
        JobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound {
                entity: "Job",
                id: job_id,
            })
    }
}

/// Wire name for a status ID, for error messages.
fn status_label(status_id: StatusId) -> &'static str {
    match status_id {
        s if s == JobStatus::Queued.id() => "queued",
        s if s == JobStatus::Running.id() => "running",
        s if s == JobStatus::Succeeded.id() => "succeeded",
        s if s == JobStatus::Failed.id() => "failed",
        s if s == JobStatus::Cancelled.id() => "cancelled",
        _ => "unknown",
    }
}
