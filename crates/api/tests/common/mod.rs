//! Common test utilities for integration tests.
//!
//! The router runs over the in-memory repositories and a scripted
//! notification sink, so these tests need no database.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use domain::services::NotificationSink;
use domain::testing::{InMemoryStore, ScriptedSink};
use serde_json::Value;
use smokewatch_api::app::create_app_with;
use smokewatch_api::config::{
    Config, DatabaseConfig, FcmConfig, IngestionConfig, LoggingConfig, NotificationsConfig,
    SecurityConfig, ServerConfig, UnknownDevicePolicyKind,
};
use tower::ServiceExt;

/// Test configuration: first-available adoption, no cooldown, log provider.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
            max_body_size: 1_048_576,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig::default(),
        ingestion: IngestionConfig {
            unknown_device_policy: UnknownDevicePolicyKind::FirstAvailable,
            default_account: None,
            alarm_cooldown_secs: 0,
        },
        notifications: NotificationsConfig {
            timeout_ms: 500,
            max_concurrency: 4,
            ..NotificationsConfig::default()
        },
        fcm: FcmConfig::default(),
    }
}

/// Router plus the fakes behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub sink: Arc<ScriptedSink>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(test_config(), ScriptedSink::new())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with(config, ScriptedSink::new())
    }

    pub fn with_sink(sink: ScriptedSink) -> Self {
        Self::with(test_config(), sink)
    }

    pub fn with(config: Config, sink: ScriptedSink) -> Self {
        let store = InMemoryStore::new();
        let sink = Arc::new(sink);
        let router = create_app_with(
            config,
            store.repositories(),
            sink.clone() as Arc<dyn NotificationSink>,
            None,
        );
        Self {
            router,
            store,
            sink,
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// POST a raw body without a content type, as some devices do.
    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, parse_response_body(response).await)
    }
}

/// Parse a JSON response body.
pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// Assert the shared error body shape and return its message.
pub fn error_message(body: &Value) -> String {
    assert_eq!(body["success"], false, "not an error body: {}", body);
    assert!(body["code"].is_string(), "missing code: {}", body);
    body["error"].as_str().unwrap_or_default().to_string()
}
