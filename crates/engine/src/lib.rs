//! The moving parts of the platform: admission control, the dispatcher
//! worker pool, and the broadcast scheduler.
//!
//! Everything here is built on short database transactions. No lock or
//! transaction is ever held across a provider call or a broadcast
//! delivery.

pub mod broadcast;
pub mod config;
pub mod dispatcher;
pub mod queue;
pub mod sink;

pub use broadcast::BroadcastScheduler;
pub use config::EngineConfig;
pub use dispatcher::Dispatcher;
pub use queue::QueueService;
pub use sink::{BroadcastSink, TracingSink};

use atelier_core::error::CoreError;

/// Map a low-level database error into the domain taxonomy.
pub(crate) fn db_error(err: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("Database error: {err}"))
}
