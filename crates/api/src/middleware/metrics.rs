//! Prometheus metrics middleware.
//!
//! HTTP request metrics, the ingestion pipeline counters, and the export
//! endpoint.

use std::sync::OnceLock;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::AlarmType;
use domain::services::FanoutResult;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::app::AppState;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_to_str(req.method());
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(duration);

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// One inbound device event, by outcome (`accepted` or `rejected`).
pub fn record_device_event(outcome: &'static str) {
    counter!("device_events_total", "outcome" => outcome).increment(1);
}

pub fn record_device_adopted() {
    counter!("devices_adopted_total").increment(1);
}

pub fn record_alarm_recorded(alarm_type: AlarmType) {
    counter!("alarms_recorded_total", "type" => alarm_type.as_str()).increment(1);
}

pub fn record_alarm_suppressed() {
    counter!("alarms_suppressed_total").increment(1);
}

/// Per-token delivery results of one fan-out.
pub fn record_push_deliveries(result: &FanoutResult) {
    if result.succeeded > 0 {
        counter!("push_deliveries_total", "outcome" => "delivered")
            .increment(result.succeeded as u64);
    }
    if result.failed > 0 {
        counter!("push_deliveries_total", "outcome" => "failed").increment(result.failed as u64);
    }
    if result.pruned > 0 {
        counter!("push_tokens_pruned_total").increment(result.pruned as u64);
    }
}

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let Some(handle) = PROMETHEUS_HANDLE.get() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        );
    };

    if let Some(pool) = &state.pool {
        persistence::metrics::record_pool_metrics(pool);
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

/// Initialize the Prometheus metrics recorder.
///
/// Must be called during application startup before any metrics are
/// recorded. Calling it again after a successful install is a no-op.
pub fn init_metrics() -> Result<(), BuildError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0])?
        .install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle);
    Ok(())
}
