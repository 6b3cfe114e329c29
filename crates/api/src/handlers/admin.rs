//! Administrator operations: pricing, grants, moderation, priority jobs,
//! and broadcasts.
//!
//! Each operation is a dedicated handler over a typed request body; the
//! transport decides who may call these routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use atelier_core::ledger::{self, LedgerReason};
use atelier_core::media::MediaType;
use atelier_core::types::{Credits, DbId};
use atelier_db::models::broadcast::{Broadcast, BroadcastSelector, BroadcastTarget};
use atelier_db::repositories::{LedgerRepo, PriceRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::{build_submission, SubmitJobRequest};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Body of `PUT /api/v1/admin/prices/{code}`.
#[derive(Debug, Deserialize)]
pub struct SetPriceRequest {
    pub price: Credits,
}

/// PUT /api/v1/admin/prices/{code}
///
/// Only jobs priced after this change see the new value; reserved prices
/// are frozen at admission.
pub async fn set_price(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(input): Json<SetPriceRequest>,
) -> AppResult<impl IntoResponse> {
    let media_type = MediaType::from_code(&code).map_err(AppError::Core)?;
    ledger::validate_price(input.price).map_err(AppError::Core)?;

    if !PriceRepo::set(&state.pool, media_type.id(), input.price).await? {
        return Err(AppError::NotFound(format!("Price entry for {code}")));
    }

    let entry = PriceRepo::get(&state.pool, media_type.id())
        .await?
        .ok_or_else(|| AppError::InternalError("Price row vanished after update".into()))?;

    tracing::info!(code = %code, price = input.price, "Price updated");
    Ok(Json(DataResponse { data: entry }))
}

/// GET /api/v1/admin/prices
pub async fn list_prices(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let prices = PriceRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: prices }))
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/admin/grants`.
#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub external_id: String,
    pub amount: Credits,
}

/// POST /api/v1/admin/grants
///
/// Credits a user's balance. Negative amounts are rejected without any
/// state change.
pub async fn grant(
    State(state): State<AppState>,
    Json(input): Json<GrantRequest>,
) -> AppResult<impl IntoResponse> {
    ledger::validate_grant_amount(input.amount).map_err(AppError::Core)?;

    let user = UserRepo::find_by_external_id(&state.pool, &input.external_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", input.external_id)))?;

    let transaction =
        LedgerRepo::grant(&state.pool, user.id, input.amount, LedgerReason::Grant).await?;

    tracing::info!(
        user_id = user.id,
        amount = input.amount,
        "Administrator grant applied",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: transaction })))
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/users/{external_id}/ban
///
/// Idempotent. Jobs already admitted are unaffected; only future
/// admissions are blocked.
pub async fn ban_user(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    set_ban_flag(&state, &external_id, true).await
}

/// POST /api/v1/admin/users/{external_id}/unban
pub async fn unban_user(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    set_ban_flag(&state, &external_id, false).await
}

async fn set_ban_flag(
    state: &AppState,
    external_id: &str,
    banned: bool,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_external_id(&state.pool, external_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {external_id}")))?;

    UserRepo::set_banned(&state.pool, user.id, banned).await?;

    tracing::info!(user_id = user.id, banned, "Moderation flag updated");
    Ok(Json(DataResponse {
        data: json!({ "user_id": user.id, "banned": banned }),
    }))
}

// ---------------------------------------------------------------------------
// Priority jobs
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/jobs
///
/// The override path: bypasses concurrency and depth checks and jumps
/// the FIFO order. Credit is still reserved.
pub async fn submit_admin_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJobRequest>,
) -> AppResult<impl IntoResponse> {
    let submission = build_submission(&state, &input).await?;
    let job = state.queue.submit_admin(submission).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// Broadcasts
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/admin/broadcasts`.
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub message: String,
    pub selector: BroadcastSelector,
}

/// Response body for broadcast status queries.
#[derive(Debug, Serialize)]
pub struct BroadcastStatusResponse {
    pub broadcast: Broadcast,
    pub failed_targets: Vec<BroadcastTarget>,
}

/// POST /api/v1/admin/broadcasts
pub async fn create_broadcast(
    State(state): State<AppState>,
    Json(input): Json<BroadcastRequest>,
) -> AppResult<impl IntoResponse> {
    let broadcast = state
        .broadcaster
        .schedule(&input.message, input.selector)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: broadcast })))
}

/// GET /api/v1/admin/broadcasts/{id}
///
/// Current status plus the retrievable list of failed targets.
pub async fn get_broadcast(
    State(state): State<AppState>,
    Path(broadcast_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let (broadcast, failed_targets) = state.broadcaster.status(broadcast_id).await?;
    Ok(Json(DataResponse {
        data: BroadcastStatusResponse {
            broadcast,
            failed_targets,
        },
    }))
}
