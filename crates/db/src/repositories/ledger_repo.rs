//! Repository for `ledger_transactions` and `reservations`.
//!
//! The transaction log is append-only: this module only ever INSERTs into
//! it. Balance updates and their log entries always happen on the same
//! connection, inside the caller's transaction, behind the user row lock
//! taken by `UserRepo::lock_for_update`.

use sqlx::{PgConnection, PgPool};

use atelier_core::ledger::LedgerReason;
use atelier_core::types::{Credits, DbId};

use crate::models::ledger::{LedgerTransaction, Reservation};
use crate::models::status::ReservationState;

/// Column list for `ledger_transactions` queries.
const TX_COLUMNS: &str = "id, user_id, delta, reason, job_id, created_at";

/// Column list for `reservations` queries.
const RES_COLUMNS: &str = "id, user_id, job_id, amount, state_id, created_at, resolved_at";

/// Provides the atomic ledger operations.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Apply a signed delta to a user's balance and append the matching
    /// log entry. The caller must hold the user row lock.
    ///
    /// The `CHECK (balance >= 0)` constraint is the last line of defence;
    /// callers check balances before debiting.
    pub async fn apply_delta(
        conn: &mut PgConnection,
        user_id: DbId,
        delta: Credits,
        reason: LedgerReason,
        job_id: Option<DbId>,
    ) -> Result<LedgerTransaction, sqlx::Error> {
        sqlx::query(
            "UPDATE users SET balance = balance + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(delta)
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "INSERT INTO ledger_transactions (user_id, delta, reason, job_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {TX_COLUMNS}"
        );
        sqlx::query_as::<_, LedgerTransaction>(&query)
            .bind(user_id)
            .bind(delta)
            .bind(reason.as_str())
            .bind(job_id)
            .fetch_one(conn)
            .await
    }

    /// Create a `held` reservation after the reserve debit has been applied.
    pub async fn create_reservation(
        conn: &mut PgConnection,
        user_id: DbId,
        amount: Credits,
    ) -> Result<Reservation, sqlx::Error> {
        let query = format!(
            "INSERT INTO reservations (user_id, amount) \
             VALUES ($1, $2) \
             RETURNING {RES_COLUMNS}"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(user_id)
            .bind(amount)
            .fetch_one(conn)
            .await
    }

    /// Attach the job created in the same admission transaction to its
    /// reservation.
    pub async fn attach_job(
        conn: &mut PgConnection,
        reservation_id: DbId,
        job_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE reservations SET job_id = $2 WHERE id = $1")
            .bind(reservation_id)
            .bind(job_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Resolve a reservation as committed.
    ///
    /// The conditional `state_id = held` update is what makes resolution
    /// exactly-once: the loser of any race matches zero rows and gets
    /// `None`. No balance change; a zero-delta `commit` entry marks the
    /// finalization in the log.
    pub async fn commit(
        conn: &mut PgConnection,
        reservation_id: DbId,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!(
            "UPDATE reservations \
             SET state_id = $2, resolved_at = NOW() \
             WHERE id = $1 AND state_id = $3 \
             RETURNING {RES_COLUMNS}"
        );
        let resolved = sqlx::query_as::<_, Reservation>(&query)
            .bind(reservation_id)
            .bind(ReservationState::Committed.id())
            .bind(ReservationState::Held.id())
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(ref reservation) = resolved {
            Self::apply_delta(
                conn,
                reservation.user_id,
                0,
                LedgerReason::Commit,
                reservation.job_id,
            )
            .await?;
        }
        Ok(resolved)
    }

    /// Resolve a reservation as refunded, restoring the balance.
    ///
    /// Same exactly-once guard as [`commit`](Self::commit). The caller
    /// must hold the user row lock before calling.
    pub async fn refund(
        conn: &mut PgConnection,
        reservation_id: DbId,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!(
            "UPDATE reservations \
             SET state_id = $2, resolved_at = NOW() \
             WHERE id = $1 AND state_id = $3 \
             RETURNING {RES_COLUMNS}"
        );
        let resolved = sqlx::query_as::<_, Reservation>(&query)
            .bind(reservation_id)
            .bind(ReservationState::Refunded.id())
            .bind(ReservationState::Held.id())
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(ref reservation) = resolved {
            Self::apply_delta(
                conn,
                reservation.user_id,
                reservation.amount,
                LedgerReason::Refund,
                reservation.job_id,
            )
            .await?;
        }
        Ok(resolved)
    }

    /// Credit a user's balance by administrator action.
    ///
    /// Runs its own transaction: user row lock, balance update, log
    /// entry. Amount validation happens in the caller via
    /// `atelier_core::ledger::validate_grant_amount`.
    pub async fn grant(
        pool: &PgPool,
        user_id: DbId,
        amount: Credits,
        reason: LedgerReason,
    ) -> Result<LedgerTransaction, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let transaction = Self::apply_delta(&mut *tx, user_id, amount, reason, None).await?;

        tx.commit().await?;
        Ok(transaction)
    }

    /// Find a reservation by its ID.
    pub async fn find_reservation(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!("SELECT {RES_COLUMNS} FROM reservations WHERE id = $1");
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Current balance for a user. A single-row read, so always a
    /// consistent snapshot.
    pub async fn balance(pool: &PgPool, user_id: DbId) -> Result<Option<Credits>, sqlx::Error> {
        sqlx::query_scalar::<_, Credits>("SELECT balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Recompute a user's balance from the transaction log.
    ///
    /// Used by diagnostics and tests to assert `balance == SUM(delta)`.
    pub async fn reconciled_balance(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Credits, sqlx::Error> {
        sqlx::query_scalar::<_, Credits>(
            "SELECT COALESCE(SUM(delta), 0)::BIGINT FROM ledger_transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Most recent transactions for a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<LedgerTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {TX_COLUMNS} FROM ledger_transactions \
             WHERE user_id = $1 \
             ORDER BY id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, LedgerTransaction>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// All transactions tied to a job, oldest first. Audit helper.
    pub async fn list_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<LedgerTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {TX_COLUMNS} FROM ledger_transactions \
             WHERE job_id = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, LedgerTransaction>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
