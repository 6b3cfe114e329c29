//! Integration tests for job submission, cancellation, and the error
//! taxonomy's HTTP mapping.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, get, send_json};
use serde_json::json;
use sqlx::PgPool;

/// Create a user through its first interaction and grant it credit.
///
/// The grant endpoint requires an existing user; a rejected submission
/// still creates the user row.
async fn grant(pool: &PgPool, external_id: &str, amount: i64) {
    let app = common::build_test_app(pool.clone());
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/jobs",
        json!({ "external_id": external_id, "media_type": "text" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let app = common::build_test_app(pool.clone());
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/admin/grants",
        json!({ "external_id": external_id, "amount": amount }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_without_credit_returns_402(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/jobs",
        json!({ "external_id": "tg-1", "media_type": "image", "payload": {"prompt": "x"} }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INSUFFICIENT_CREDIT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_with_unknown_media_type_returns_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/jobs",
        json!({ "external_id": "tg-1", "media_type": "gif" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNKNOWN_TYPE");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn funded_submission_is_queued(pool: PgPool) {
    grant(&pool, "tg-1", 100).await;

    let app = common::build_test_app(pool.clone());
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/jobs",
        json!({ "external_id": "tg-1", "media_type": "image", "payload": {"prompt": "x"} }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status_id"], 1);
    assert_eq!(body["data"]["reserved_price"], 40);

    // Balance reflects the reservation.
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/users/tg-1/balance").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["balance"], 60);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn banned_user_submission_returns_403(pool: PgPool) {
    grant(&pool, "tg-1", 100).await;

    let app = common::build_test_app(pool.clone());
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/admin/users/tg-1/ban",
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/jobs",
        json!({ "external_id": "tg-1", "media_type": "text" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], "USER_BANNED");
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn cancel_refunds_and_rejects_foreign_callers(pool: PgPool) {
    grant(&pool, "tg-1", 100).await;
    grant(&pool, "tg-2", 100).await;

    let app = common::build_test_app(pool.clone());
    let response = send_json(
        app,
        Method::POST,
        "/api/v1/jobs",
        json!({ "external_id": "tg-1", "media_type": "image" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let job_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    // Another user may not cancel it.
    let app = common::build_test_app(pool.clone());
    let response = send_json(
        app,
        Method::POST,
        &format!("/api/v1/jobs/{job_id}/cancel"),
        json!({ "external_id": "tg-2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The owner can; the reservation is refunded.
    let app = common::build_test_app(pool.clone());
    let response = send_json(
        app,
        Method::POST,
        &format!("/api/v1/jobs/{job_id}/cancel"),
        json!({ "external_id": "tg-1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status_id"], 5);

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/users/tg-1/balance").await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["balance"], 100);

    // Cancelling again is a state conflict.
    let app = common::build_test_app(pool);
    let response = send_json(
        app,
        Method::POST,
        &format!("/api/v1/jobs/{job_id}/cancel"),
        json!({ "external_id": "tg-1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn list_filters_by_user_and_status(pool: PgPool) {
    grant(&pool, "tg-1", 500).await;

    for _ in 0..2 {
        let app = common::build_test_app(pool.clone());
        let response = send_json(
            app,
            Method::POST,
            "/api/v1/jobs",
            json!({ "external_id": "tg-1", "media_type": "text" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/jobs?external_id=tg-1&status=queued").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/jobs?external_id=tg-1&status=failed").await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}
