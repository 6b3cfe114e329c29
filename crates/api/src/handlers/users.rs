//! Handlers for user balance and ledger history.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use atelier_core::types::{Credits, DbId};
use atelier_db::repositories::{LedgerRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default number of ledger entries returned by the history endpoint.
const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Response body for the balance endpoint.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: DbId,
    pub external_id: String,
    pub balance: Credits,
}

/// Query parameters for the ledger history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

/// GET /api/v1/users/{external_id}/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_external_id(&state.pool, &external_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {external_id}")))?;

    Ok(Json(DataResponse {
        data: BalanceResponse {
            user_id: user.id,
            external_id: user.external_id,
            balance: user.balance,
        },
    }))
}

/// GET /api/v1/users/{external_id}/ledger
///
/// Most recent ledger transactions, newest first.
pub async fn get_ledger(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_external_id(&state.pool, &external_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {external_id}")))?;

    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 100);
    let transactions = LedgerRepo::list_for_user(&state.pool, user.id, limit).await?;

    Ok(Json(DataResponse { data: transactions }))
}
