//! Health check endpoint handlers.

use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::app::AppState;
use crate::error::ApiError;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseHealth>,
    pub notifications: NotificationsHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationsHealth {
    pub provider: String,
    pub configured: bool,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

async fn check_database(pool: &PgPool) -> DatabaseHealth {
    let start = std::time::Instant::now();
    let connected = persistence::db::ping(pool).await.is_ok();
    DatabaseHealth {
        connected,
        latency_ms: connected.then(|| start.elapsed().as_millis() as u64),
    }
}

/// Full health check endpoint.
///
/// A disconnected database reports `unhealthy` with 503. Missing push
/// credentials degrade the status but keep the service up, since status
/// ingestion still works.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let database = match &state.pool {
        Some(pool) => Some(check_database(pool).await),
        None => None,
    };
    let db_connected = database.as_ref().map_or(true, |d| d.connected);

    let notifications = NotificationsHealth {
        provider: state.ingestion.notification_provider().to_string(),
        configured: state.ingestion.notifications_configured(),
    };

    if !db_connected {
        return Err(ApiError::ServiceUnavailable(
            "Database unavailable".to_string(),
        ));
    }

    let status = if notifications.configured {
        "healthy"
    } else {
        "degraded"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        notifications,
    }))
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    if let Some(pool) = &state.pool {
        if persistence::db::ping(pool).await.is_err() {
            return Err(ApiError::ServiceUnavailable("Database unavailable".to_string()));
        }
    }

    Ok(Json(StatusResponse {
        status: "ready".to_string(),
    }))
}
