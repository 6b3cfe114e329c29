//! Shared fixtures for engine integration tests.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use atelier_core::ledger::LedgerReason;
use atelier_core::types::{Credits, DbId};
use atelier_db::models::user::{RegisterUser, User};
use atelier_db::repositories::{LedgerRepo, UserRepo};
use atelier_engine::{BroadcastSink, EngineConfig};
use atelier_providers::{GenerationRequest, GenerationResult, Provider, ProviderError};

/// Engine configuration with short delays suitable for tests.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        worker_count: 1,
        user_active_job_limit: 3,
        queue_depth_limit: 256,
        max_retries: 3,
        retry_base_delay: Duration::from_millis(10),
        provider_timeout: Duration::from_millis(200),
        dispatch_poll_interval: Duration::from_millis(10),
        broadcast_batch_size: 25,
        broadcast_interval: Duration::from_millis(10),
    }
}

/// Create a user and grant it an initial balance.
pub async fn create_user(pool: &PgPool, external_id: &str, balance: Credits) -> User {
    let user = UserRepo::get_or_create(
        pool,
        &RegisterUser {
            external_id: external_id.to_string(),
            display_name: None,
        },
    )
    .await
    .expect("user upsert");

    if balance > 0 {
        LedgerRepo::grant(pool, user.id, balance, LedgerReason::Grant)
            .await
            .expect("initial grant");
    }

    UserRepo::find_by_id(pool, user.id)
        .await
        .expect("user reload")
        .expect("user exists")
}

// ---------------------------------------------------------------------------
// Mock provider
// ---------------------------------------------------------------------------

/// A scripted provider outcome.
#[allow(dead_code)]
pub enum MockOutcome {
    Success(serde_json::Value),
    Transient(&'static str),
    Fatal(&'static str),
    /// Never returns; used to exercise the dispatcher timeout.
    Hang,
}

/// Provider double that plays back a script of outcomes.
///
/// Once the script is exhausted, every further call succeeds with an
/// empty result.
pub struct MockProvider {
    script: Mutex<VecDeque<MockOutcome>>,
    pub calls: AtomicU32,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new(script: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_succeeding() -> Self {
        Self::new(Vec::new())
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let outcome = self.script.lock().expect("script lock").pop_front();
        match outcome {
            None => Ok(GenerationResult {
                reference: Some(format!("mock-{}", request.job_id)),
                output: serde_json::json!({ "ok": true }),
            }),
            Some(MockOutcome::Success(output)) => Ok(GenerationResult {
                reference: Some(format!("mock-{}", request.job_id)),
                output,
            }),
            Some(MockOutcome::Transient(message)) => {
                Err(ProviderError::Transient(message.to_string()))
            }
            Some(MockOutcome::Fatal(message)) => Err(ProviderError::Fatal(message.to_string())),
            Some(MockOutcome::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Transient("woke from eternal sleep".into()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Recording sink
// ---------------------------------------------------------------------------

/// Broadcast sink that records deliveries and fails for chosen users.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<DbId>>,
    pub fail_for: HashSet<DbId>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(user_ids: impl IntoIterator<Item = DbId>) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail_for: user_ids.into_iter().collect(),
        }
    }

    pub fn deliveries(&self) -> Vec<DbId> {
        self.delivered.lock().expect("deliveries lock").clone()
    }
}

#[async_trait]
impl BroadcastSink for RecordingSink {
    async fn deliver(&self, user: &User, _message: &str) -> Result<(), String> {
        if self.fail_for.contains(&user.id) {
            return Err("simulated delivery failure".to_string());
        }
        self.delivered.lock().expect("deliveries lock").push(user.id);
        Ok(())
    }
}
