//! Broadcast entity models and the target selector.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use atelier_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `broadcasts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Broadcast {
    pub id: DbId,
    pub message: String,
    /// Serialized [`BroadcastSelector`], kept for audit.
    pub selector: serde_json::Value,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// A row from the `broadcast_targets` table.
///
/// Target rows double as the resume checkpoint: only `Pending` targets are
/// ever attempted, so a restart never re-sends to a delivered target.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BroadcastTarget {
    pub id: DbId,
    pub broadcast_id: DbId,
    pub user_id: DbId,
    pub state_id: StatusId,
    pub error: Option<String>,
    pub attempted_at: Option<Timestamp>,
}

/// Who a broadcast goes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BroadcastSelector {
    /// Every user that is not banned.
    All,
    /// An explicit list of user ids.
    Users { ids: Vec<DbId> },
}

/// Per-state target counts for a broadcast, used for finalization.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct TargetCounts {
    pub pending: i64,
    pub delivered: i64,
    pub failed: i64,
}
