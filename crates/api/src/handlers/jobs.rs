//! Handlers for the `/jobs` resource.
//!
//! Users are addressed by the transport's external id and are created on
//! first interaction, so a submission never fails on a missing account.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use atelier_core::media::MediaType;
use atelier_core::types::DbId;
use atelier_db::models::job::JobFilter;
use atelier_db::models::status::JobStatus;
use atelier_db::models::user::RegisterUser;
use atelier_db::repositories::UserRepo;
use atelier_engine::queue::Submission;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/jobs` (and the admin override route).
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub external_id: String,
    pub display_name: Option<String>,
    /// Media type code: `text`, `image`, `video`, `audio`, `3d`.
    pub media_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub idempotency_key: Option<String>,
}

/// Body of `POST /api/v1/jobs/{id}/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelJobRequest {
    pub external_id: String,
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct JobListParams {
    pub external_id: Option<String>,
    /// Status name: `queued`, `running`, `succeeded`, `failed`, `cancelled`.
    pub status: Option<String>,
    /// Media type code.
    pub media_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Run the admission pipeline and return 201 with the queued job.
/// Admission errors are returned synchronously with no side effects.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJobRequest>,
) -> AppResult<impl IntoResponse> {
    let submission = build_submission(&state, &input).await?;
    let job = state.queue.submit(submission).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// Resolve the user and media type shared by the normal and admin paths.
pub(crate) async fn build_submission(
    state: &AppState,
    input: &SubmitJobRequest,
) -> AppResult<Submission> {
    let media_type = MediaType::from_code(&input.media_type).map_err(AppError::Core)?;

    let user = UserRepo::get_or_create(
        &state.pool,
        &RegisterUser {
            external_id: input.external_id.clone(),
            display_name: input.display_name.clone(),
        },
    )
    .await?;

    Ok(Submission {
        user_id: user.id,
        media_type,
        payload: input.payload.clone(),
        idempotency_key: input.idempotency_key.clone(),
    })
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/cancel
///
/// Allowed only while the job is queued and only for its owner. Returns
/// the cancelled job; 409 if the job already left the queue.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(input): Json<CancelJobRequest>,
) -> AppResult<impl IntoResponse> {
    let job = state.queue.get(job_id).await?;

    let user = UserRepo::find_by_external_id(&state.pool, &input.external_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", input.external_id)))?;

    if job.user_id != user.id {
        return Err(AppError::Forbidden(
            "Cannot cancel another user's job".to_string(),
        ));
    }

    let cancelled = state.queue.cancel(job_id).await?;

    tracing::info!(job_id, user_id = user.id, "Job cancelled via API");
    Ok(Json(DataResponse { data: cancelled }))
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// Read-only snapshot filtered by user, status, and media type.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListParams>,
) -> AppResult<impl IntoResponse> {
    let user_id = match &params.external_id {
        Some(external_id) => Some(
            UserRepo::find_by_external_id(&state.pool, external_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {external_id}")))?
                .id,
        ),
        None => None,
    };

    let status_id = match &params.status {
        Some(name) => Some(
            JobStatus::from_name(name)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {name}")))?
                .id(),
        ),
        None => None,
    };

    let media_type_id = match &params.media_type {
        Some(code) => Some(MediaType::from_code(code).map_err(AppError::Core)?.id()),
        None => None,
    };

    let jobs = state
        .queue
        .list(&JobFilter {
            user_id,
            status_id,
            media_type_id,
            limit: params.limit,
            offset: params.offset,
        })
        .await?;

    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.queue.get(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}
