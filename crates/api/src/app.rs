use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::repositories::Repositories;
use domain::services::{AccountService, IngestionService, NotificationSink};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{accounts, alarms, devices, health, webhook};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Absent when the app runs over in-memory repositories.
    pub pool: Option<PgPool>,
    pub ingestion: Arc<IngestionService>,
    pub accounts: Arc<AccountService>,
}

/// Build the application over Postgres.
pub fn create_app(config: Config, pool: PgPool, sink: Arc<dyn NotificationSink>) -> Router {
    let repos = persistence::postgres_repositories(pool.clone());
    create_app_with(config, repos, sink, Some(pool))
}

/// Build the application over any repository implementation.
pub fn create_app_with(
    config: Config,
    repos: Repositories,
    sink: Arc<dyn NotificationSink>,
    pool: Option<PgPool>,
) -> Router {
    let ingestion = IngestionService::new(&repos, sink, config.pipeline_config());
    let accounts = AccountService::new(repos);

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        pool,
        ingestion: Arc::new(ingestion),
        accounts: Arc::new(accounts),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Device-facing ingestion
    let webhook_routes = Router::new().route("/webhook/device-event", post(webhook::device_event));

    // App-facing routes, keyed by user code
    let app_routes = Router::new()
        .route("/test-alarm", post(alarms::test_alarm))
        .route("/alarm-history", post(alarms::alarm_history))
        .route("/acknowledge-alarm", post(alarms::acknowledge_alarm))
        .route("/device-status", post(devices::device_status))
        .route("/register-device", post(devices::register_device))
        .route("/verify-code", post(accounts::verify_code))
        .route("/register-push-token", post(accounts::register_push_token));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .merge(app_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
