use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atelier_api::config::ServerConfig;
use atelier_api::{router, state};
use atelier_core::media::ALL_MEDIA_TYPES;
use atelier_engine::{BroadcastScheduler, Dispatcher, EngineConfig, QueueService, TracingSink};
use atelier_providers::{HttpProvider, ProviderRegistry};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_api=debug,atelier_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let engine_config = EngineConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = atelier_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    atelier_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    atelier_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Providers ---
    let registry = Arc::new(build_provider_registry());
    tracing::info!(
        supported = ?registry.supported().iter().map(|m| m.code()).collect::<Vec<_>>(),
        "Provider registry built",
    );

    // --- Engine services ---
    let queue = QueueService::new(pool.clone(), engine_config.clone());
    let broadcaster =
        BroadcastScheduler::new(pool.clone(), Arc::new(TracingSink), engine_config.clone());
    let dispatcher = Dispatcher::new(pool.clone(), Arc::clone(&registry), engine_config.clone());

    let cancel = tokio_util::sync::CancellationToken::new();
    let worker_handles = dispatcher.spawn_workers(cancel.clone());
    tracing::info!(workers = worker_handles.len(), "Dispatcher workers started");

    let broadcast_cancel = cancel.clone();
    let broadcaster_for_loop = broadcaster.clone();
    let broadcast_handle = tokio::spawn(async move {
        broadcaster_for_loop.run(broadcast_cancel).await;
    });
    tracing::info!("Broadcast scheduler started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        queue,
        broadcaster,
    };

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api/v1).
        .merge(router::health_router())
        // API v1 routes.
        .nest("/api/v1", router::api_routes())
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500 JSON.
        .layer(CatchPanicLayer::new())
        // Request timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        // CORS.
        .layer(cors)
        // Shared state.
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop claiming new work; in-flight provider calls finish or time out.
    cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    for handle in worker_handles {
        let _ = tokio::time::timeout(drain, handle).await;
    }
    tracing::info!("Dispatcher workers stopped");

    let _ = tokio::time::timeout(Duration::from_secs(5), broadcast_handle).await;
    tracing::info!("Broadcast scheduler stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Build the provider registry from environment variables.
///
/// `GENAPI_BASE_URL` + `GENAPI_TOKEN` configure one HTTP generation
/// service serving every media type. A per-type override
/// (`GENAPI_BASE_URL_IMAGE`, ...) wins over the shared default.
fn build_provider_registry() -> ProviderRegistry {
    let base_url = std::env::var("GENAPI_BASE_URL").ok();
    let token = std::env::var("GENAPI_TOKEN").unwrap_or_default();

    let mut registry = ProviderRegistry::new();
    for media_type in ALL_MEDIA_TYPES {
        let suffix = media_type.code().to_uppercase().replace('3', "THREE");
        let url = std::env::var(format!("GENAPI_BASE_URL_{suffix}"))
            .ok()
            .or_else(|| base_url.clone());
        if let Some(url) = url {
            registry = registry.with_provider(
                media_type,
                Arc::new(HttpProvider::new(url, token.clone())),
            );
        }
    }
    registry
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid, which is the
/// desired behaviour -- we want misconfiguration to fail fast.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
