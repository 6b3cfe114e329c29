//! Ledger transaction and reservation row models.

use serde::Serialize;
use sqlx::FromRow;

use atelier_core::types::{Credits, DbId, Timestamp};

use super::status::StatusId;

/// A row from the append-only `ledger_transactions` table.
///
/// Immutable once written. A user's balance is the running sum of their
/// deltas; `reason` attributes every movement for audit.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerTransaction {
    pub id: DbId,
    pub user_id: DbId,
    pub delta: Credits,
    /// One of `reserve`, `commit`, `refund`, `grant`, `admin_adjust`.
    pub reason: String,
    pub job_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A row from the `reservations` table.
///
/// The reservation id is the token handed back by `reserve`; conditional
/// updates on `state_id` enforce resolved-exactly-once.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reservation {
    pub id: DbId,
    pub user_id: DbId,
    pub job_id: Option<DbId>,
    pub amount: Credits,
    pub state_id: StatusId,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}
