//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use atelier_core::types::{Credits, DbId, Timestamp};

/// A row from the `users` table.
///
/// `balance` is mutated only inside ledger operations under the user row
/// lock; the transaction log is the auditable source of truth.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    /// The transport's stable identifier for this user (e.g. a chat id).
    pub external_id: String,
    pub display_name: Option<String>,
    pub balance: Credits,
    pub is_banned: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering (or refreshing) a user on first interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub external_id: String,
    pub display_name: Option<String>,
}
