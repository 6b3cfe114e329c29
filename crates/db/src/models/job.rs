//! Job entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use atelier_core::media::MediaTypeId;
use atelier_core::types::{Credits, DbId, Timestamp};

use super::status::StatusId;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub user_id: DbId,
    pub media_type_id: MediaTypeId,
    pub status_id: StatusId,
    pub priority: i32,
    /// Price frozen at admission; later price-table edits do not affect it.
    pub reserved_price: Credits,
    pub reservation_id: DbId,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    /// Opaque handle into the provider that produced the result.
    pub provider_ref: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

/// Insert parameters for a new job, built inside the admission transaction.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: DbId,
    pub media_type_id: MediaTypeId,
    pub priority: i32,
    pub reserved_price: Credits,
    pub reservation_id: DbId,
    pub payload: serde_json::Value,
    pub idempotency_key: Option<String>,
}

/// Filter for job listing. All fields optional; combined with AND.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct JobFilter {
    pub user_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub media_type_id: Option<MediaTypeId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
