//! The dispatcher worker pool.
//!
//! A fixed number of tokio tasks each loop: claim the next queued job
//! (admin priority first, then FIFO), invoke the provider for the job's
//! media type under a bounded timeout, and finalize ledger and job state
//! in one transaction. Transient failures retry locally with exponential
//! backoff; they are never observable as a status change.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use atelier_core::error::{CoreError, CoreResult};
use atelier_core::media::MediaType;
use atelier_db::models::job::Job;
use atelier_db::repositories::{JobRepo, LedgerRepo, UserRepo};
use atelier_db::DbPool;
use atelier_providers::{GenerationRequest, GenerationResult, Provider, ProviderError, ProviderRegistry};

use crate::config::EngineConfig;
use crate::db_error;

/// Outcome of a provider execution including local retries.
enum Execution {
    Succeeded(GenerationResult),
    Failed(String),
}

/// Claims queued jobs and drives them to a terminal state.
#[derive(Clone)]
pub struct Dispatcher {
    pool: DbPool,
    registry: Arc<ProviderRegistry>,
    config: EngineConfig,
}

impl Dispatcher {
    pub fn new(pool: DbPool, registry: Arc<ProviderRegistry>, config: EngineConfig) -> Self {
        Self {
            pool,
            registry,
            config,
        }
    }

    /// Spawn the configured number of worker tasks. Each runs until the
    /// cancellation token is triggered; in-flight jobs finish first.
    pub fn spawn_workers(&self, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.worker_count)
            .map(|worker_id| {
                let dispatcher = self.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    dispatcher.run_worker(worker_id, cancel).await;
                })
            })
            .collect()
    }

    /// One worker's claim loop.
    pub async fn run_worker(&self, worker_id: usize, cancel: CancellationToken) {
        tracing::info!(worker_id, "Dispatcher worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.run_once().await {
                Ok(true) => {
                    // Processed a job; immediately look for the next one.
                }
                Ok(false) => {
                    // Queue empty: idle-wait one poll interval.
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.dispatch_poll_interval) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "Dispatch cycle failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.dispatch_poll_interval) => {}
                    }
                }
            }
        }
        tracing::info!(worker_id, "Dispatcher worker stopped");
    }

    /// Claim and fully process at most one job.
    ///
    /// Returns `Ok(false)` when the queue is empty. Exposed so tests can
    /// drive the dispatcher deterministically.
    pub async fn run_once(&self) -> CoreResult<bool> {
        let Some(job) = JobRepo::claim_next(&self.pool).await.map_err(db_error)? else {
            return Ok(false);
        };

        tracing::info!(
            job_id = job.id,
            user_id = job.user_id,
            priority = job.priority,
            "Job claimed",
        );

        match self.execute(&job).await {
            Execution::Succeeded(result) => self.finalize_success(&job, result).await?,
            Execution::Failed(error) => self.finalize_failure(&job, &error).await?,
        }
        Ok(true)
    }

    /// Invoke the provider with timeout and local transient retries.
    ///
    /// No lock or transaction is held here; only the claimed job row in
    /// `running` status marks the work as ours.
    async fn execute(&self, job: &Job) -> Execution {
        let media_type = match MediaType::from_id(job.media_type_id) {
            Ok(media_type) => media_type,
            Err(e) => return Execution::Failed(e.to_string()),
        };

        let Some(provider) = self.registry.get(media_type) else {
            return Execution::Failed(format!("No provider registered for {media_type}"));
        };

        let request = GenerationRequest {
            job_id: job.id,
            media_type,
            payload: job.payload.clone(),
        };

        let policy = self.config.retry_policy();
        let mut attempts: u32 = 0;

        loop {
            match self.call_provider(provider.as_ref(), &request).await {
                Ok(result) => return Execution::Succeeded(result),
                Err(ProviderError::Fatal(message)) => {
                    tracing::warn!(job_id = job.id, error = %message, "Fatal provider error");
                    return Execution::Failed(message);
                }
                Err(ProviderError::Transient(message)) => {
                    if !policy.allows_retry(attempts) {
                        tracing::warn!(
                            job_id = job.id,
                            attempts,
                            error = %message,
                            "Retries exhausted",
                        );
                        return Execution::Failed(format!(
                            "Retries exhausted after {attempts} attempts: {message}"
                        ));
                    }

                    if let Err(e) = JobRepo::increment_retry(&self.pool, job.id).await {
                        tracing::error!(job_id = job.id, error = %e, "Failed to record retry");
                    }

                    let delay = policy.jittered_delay_for(attempts);
                    attempts += 1;
                    tracing::info!(
                        job_id = job.id,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Transient provider error, backing off",
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One provider call bounded by the configured timeout. A timeout is
    /// a transient failure.
    async fn call_provider(
        &self,
        provider: &dyn Provider,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ProviderError> {
        match tokio::time::timeout(self.config.provider_timeout, provider.generate(request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Transient(format!(
                "Provider call exceeded {}s timeout",
                self.config.provider_timeout.as_secs()
            ))),
        }
    }

    /// Commit the reservation and mark the job succeeded, atomically.
    async fn finalize_success(&self, job: &Job, result: GenerationResult) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        UserRepo::lock_for_update(&mut *tx, job.user_id)
            .await
            .map_err(db_error)?;

        if LedgerRepo::commit(&mut *tx, job.reservation_id)
            .await
            .map_err(db_error)?
            .is_none()
        {
            // Resolved-exactly-once: someone else settled this
            // reservation first, so our completion is the losing side of
            // the race and must not touch the ledger.
            tracing::warn!(
                job_id = job.id,
                reservation_id = job.reservation_id,
                "Reservation already resolved, dropping completion",
            );
            return Ok(());
        }

        let updated = JobRepo::mark_succeeded(
            &mut *tx,
            job.id,
            &result.output,
            result.reference.as_deref(),
        )
        .await
        .map_err(db_error)?;
        if !updated {
            return Err(CoreError::InvalidState(format!(
                "Job {} left running state during finalization",
                job.id
            )));
        }

        tx.commit().await.map_err(db_error)?;

        tracing::info!(job_id = job.id, "Job succeeded");
        Ok(())
    }

    /// Refund the reservation and mark the job failed, atomically. The
    /// refund lands before any caller can observe the terminal status.
    async fn finalize_failure(&self, job: &Job, error: &str) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        UserRepo::lock_for_update(&mut *tx, job.user_id)
            .await
            .map_err(db_error)?;

        if LedgerRepo::refund(&mut *tx, job.reservation_id)
            .await
            .map_err(db_error)?
            .is_none()
        {
            tracing::warn!(
                job_id = job.id,
                reservation_id = job.reservation_id,
                "Reservation already resolved, dropping failure",
            );
            return Ok(());
        }

        let updated = JobRepo::mark_failed(&mut *tx, job.id, error)
            .await
            .map_err(db_error)?;
        if !updated {
            return Err(CoreError::InvalidState(format!(
                "Job {} left running state during finalization",
                job.id
            )));
        }

        tx.commit().await.map_err(db_error)?;

        tracing::info!(job_id = job.id, error, "Job failed, reservation refunded");
        Ok(())
    }
}
