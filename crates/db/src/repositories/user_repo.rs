//! Repository for the `users` table, including the moderation flag.

use sqlx::{PgConnection, PgPool};

use atelier_core::types::DbId;

use crate::models::user::{RegisterUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, external_id, display_name, balance, is_banned, created_at, updated_at";

/// Provides CRUD and moderation operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Upsert a user on first interaction.
    ///
    /// An existing row keeps its balance and ban flag; only the display
    /// name is refreshed.
    pub async fn get_or_create(
        pool: &PgPool,
        input: &RegisterUser,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (external_id, display_name) \
             VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT uq_users_external_id \
             DO UPDATE SET display_name = EXCLUDED.display_name, updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.external_id)
            .bind(&input.display_name)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by the transport's external identifier.
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE external_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a user row for the duration of the caller's transaction.
    ///
    /// Every balance-touching operation goes through this lock, which is
    /// what serializes concurrent reserves for the same user.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Set the ban flag. Idempotent: banning a banned user is a no-op.
    ///
    /// Returns `false` if no such user exists.
    pub async fn set_banned(
        pool: &PgPool,
        id: DbId,
        banned: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_banned = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(banned)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Read the ban flag. Used on every admission check.
    pub async fn is_banned(pool: &PgPool, id: DbId) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT is_banned FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// IDs of all users eligible for an all-users broadcast (not banned).
    pub async fn all_unbanned_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM users WHERE is_banned = FALSE ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }
}
