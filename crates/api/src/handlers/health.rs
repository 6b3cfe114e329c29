//! Liveness endpoint with a database probe and queue depth.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use atelier_db::repositories::JobRepo;

use crate::state::AppState;

/// GET /health
///
/// Always returns 200; `db_healthy` tells callers whether the store is
/// reachable. Queue depth is reported for operational dashboards and is
/// `null` when the database is down.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = atelier_db::health_check(&state.pool).await.is_ok();

    let queued_jobs = match state.pool.acquire().await {
        Ok(mut conn) => JobRepo::count_queued(&mut conn).await.ok(),
        Err(_) => None,
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "db_healthy": db_healthy,
        "queued_jobs": queued_jobs,
    }))
}
