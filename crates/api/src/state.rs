use std::sync::Arc;

use atelier_engine::{BroadcastScheduler, QueueService};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: atelier_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Admission-controlled job queue.
    pub queue: QueueService,
    /// Broadcast scheduler (its run loop lives on its own task).
    pub broadcaster: BroadcastScheduler,
}
