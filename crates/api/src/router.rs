//! Route table for the HTTP facade.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{admin, health, jobs, users};
use crate::state::AppState;

/// Root-level routes (health lives outside `/api/v1`).
pub fn health_router() -> Router<AppState> {
    Router::new().route("/health", get(health::health))
}

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Jobs
        .route("/jobs", post(jobs::submit_job).get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/cancel", post(jobs::cancel_job))
        // Users
        .route("/users/{external_id}/balance", get(users::get_balance))
        .route("/users/{external_id}/ledger", get(users::get_ledger))
        // Admin
        .route(
            "/admin/prices",
            get(admin::list_prices),
        )
        .route("/admin/prices/{code}", put(admin::set_price))
        .route("/admin/grants", post(admin::grant))
        .route("/admin/users/{external_id}/ban", post(admin::ban_user))
        .route("/admin/users/{external_id}/unban", post(admin::unban_user))
        .route("/admin/jobs", post(admin::submit_admin_job))
        .route(
            "/admin/broadcasts",
            post(admin::create_broadcast),
        )
        .route("/admin/broadcasts/{id}", get(admin::get_broadcast))
}
