//! Engine configuration loaded from environment variables.

use std::time::Duration;

use atelier_core::retry::RetryPolicy;

/// Tunables for the queue, dispatcher, and broadcast scheduler.
///
/// All fields have defaults suitable for local development. In
/// production, override via environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of dispatcher worker tasks (default: `4`).
    pub worker_count: usize,
    /// Per-user cap on non-terminal jobs (default: `3`).
    pub user_active_job_limit: i64,
    /// Global cap on queued jobs before submissions get backpressure
    /// (default: `256`).
    pub queue_depth_limit: i64,
    /// Transient retry cap per job (default: `3`).
    pub max_retries: u32,
    /// Base delay of the exponential retry backoff (default: `1000` ms).
    pub retry_base_delay: Duration,
    /// Timeout for a single provider call (default: `60` s).
    pub provider_timeout: Duration,
    /// Idle poll interval of a dispatcher worker (default: `500` ms).
    pub dispatch_poll_interval: Duration,
    /// Broadcast deliveries per tick (default: `25`).
    pub broadcast_batch_size: i64,
    /// Broadcast tick interval (default: `1000` ms).
    pub broadcast_interval: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `WORKER_COUNT`              | `4`     |
    /// | `USER_ACTIVE_JOB_LIMIT`     | `3`     |
    /// | `QUEUE_DEPTH_LIMIT`         | `256`   |
    /// | `MAX_RETRIES`               | `3`     |
    /// | `RETRY_BASE_DELAY_MS`       | `1000`  |
    /// | `PROVIDER_TIMEOUT_SECS`     | `60`    |
    /// | `DISPATCH_POLL_INTERVAL_MS` | `500`   |
    /// | `BROADCAST_BATCH_SIZE`      | `25`    |
    /// | `BROADCAST_INTERVAL_MS`     | `1000`  |
    pub fn from_env() -> Self {
        Self {
            worker_count: env_parse("WORKER_COUNT", 4),
            user_active_job_limit: env_parse("USER_ACTIVE_JOB_LIMIT", 3),
            queue_depth_limit: env_parse("QUEUE_DEPTH_LIMIT", 256),
            max_retries: env_parse("MAX_RETRIES", 3),
            retry_base_delay: Duration::from_millis(env_parse("RETRY_BASE_DELAY_MS", 1000)),
            provider_timeout: Duration::from_secs(env_parse("PROVIDER_TIMEOUT_SECS", 60)),
            dispatch_poll_interval: Duration::from_millis(env_parse(
                "DISPATCH_POLL_INTERVAL_MS",
                500,
            )),
            broadcast_batch_size: env_parse("BROADCAST_BATCH_SIZE", 25),
            broadcast_interval: Duration::from_millis(env_parse("BROADCAST_INTERVAL_MS", 1000)),
        }
    }

    /// The retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            user_active_job_limit: 3,
            queue_depth_limit: 256,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            provider_timeout: Duration::from_secs(60),
            dispatch_poll_interval: Duration::from_millis(500),
            broadcast_batch_size: 25,
            broadcast_interval: Duration::from_millis(1000),
        }
    }
}

/// Parse an environment variable, panicking on malformed values.
///
/// Misconfiguration should fail fast at startup, not surface later as a
/// silently-ignored override.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value: {e}")),
        Err(_) => default,
    }
}
