//! Notification sink for push notifications.
//!
//! The sink is the external delivery transport (FCM in production). Fan-out
//! talks to it one token at a time and only ever sees a [`DeliveryOutcome`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::crypto::token_fingerprint;
use thiserror::Error;

use crate::models::AlarmEvent;

/// Notification type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    SmokeAlarm,
    TestAlarm,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::SmokeAlarm => write!(f, "smoke_alarm"),
            NotificationType::TestAlarm => write!(f, "test_alarm"),
        }
    }
}

/// One logical notification, sent unchanged to every token of an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    /// String-only data map, delivered to the client app alongside the notification.
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    /// Notification for a recorded smoke alarm.
    pub fn smoke_alarm(alarm: &AlarmEvent, device_name: &str) -> Self {
        let body = match &alarm.location {
            Some(location) => format!("Smoke detected by {} ({})", device_name, location),
            None => format!("Smoke detected by {}", device_name),
        };
        Self::for_alarm(NotificationType::SmokeAlarm, "Smoke alarm", body, alarm)
    }

    /// Notification for a manually triggered test alarm.
    pub fn test_alarm(alarm: &AlarmEvent, device_name: &str) -> Self {
        let body = format!("Test alarm from {}", device_name);
        Self::for_alarm(NotificationType::TestAlarm, "Test alarm", body, alarm)
    }

    fn for_alarm(
        notification_type: NotificationType,
        title: &str,
        body: String,
        alarm: &AlarmEvent,
    ) -> Self {
        let mut data = BTreeMap::new();
        data.insert("type".to_string(), notification_type.to_string());
        data.insert("alarmId".to_string(), alarm.id.to_string());
        data.insert("deviceId".to_string(), alarm.device_id.clone());
        data.insert("userCode".to_string(), alarm.user_code.clone());
        data.insert("timestamp".to_string(), alarm.occurred_at.to_rfc3339());
        if let Some(temperature) = alarm.temperature {
            data.insert("temperature".to_string(), temperature.to_string());
        }

        Self {
            notification_type,
            title: title.to_string(),
            body,
            data,
        }
    }
}

/// Result of delivering to a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub delivered: bool,
    pub error_reason: Option<String>,
    /// The provider reported the token as unregistered or malformed.
    pub token_invalid: bool,
}

impl DeliveryOutcome {
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            error_reason: None,
            token_invalid: false,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            delivered: false,
            error_reason: Some(reason.into()),
            token_invalid: false,
        }
    }

    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self {
            delivered: false,
            error_reason: Some(reason.into()),
            token_invalid: true,
        }
    }
}

/// The sink cannot deliver anything at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Notification provider not configured: {0}")]
    NotConfigured(String),
}

/// External push-delivery transport.
///
/// Implementations must be safe to call concurrently for different tokens.
/// Per-token problems are reported through [`DeliveryOutcome`], never as errors.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short provider name for logs and metrics.
    fn provider(&self) -> &'static str;

    /// Fails when the provider cannot be reached at all (e.g. missing credentials).
    fn ensure_configured(&self) -> Result<(), NotificationError>;

    async fn send(&self, token: &str, message: &PushMessage) -> DeliveryOutcome;
}

/// Sink that logs notifications instead of sending them.
///
/// Used in development when no push credentials are available.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationSink;

impl LoggingNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl NotificationSink for LoggingNotificationSink {
    fn provider(&self) -> &'static str {
        "log"
    }

    fn ensure_configured(&self) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn send(&self, token: &str, message: &PushMessage) -> DeliveryOutcome {
        tracing::info!(
            token = %token_fingerprint(token),
            notification_type = %message.notification_type,
            title = %message.title,
            body = %message.body,
            "Would send push notification"
        );
        DeliveryOutcome::delivered()
    }
}

/// Sink standing in for a provider whose credentials are missing.
#[derive(Debug, Clone)]
pub struct UnconfiguredNotificationSink {
    reason: String,
}

impl UnconfiguredNotificationSink {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl NotificationSink for UnconfiguredNotificationSink {
    fn provider(&self) -> &'static str {
        "unconfigured"
    }

    fn ensure_configured(&self) -> Result<(), NotificationError> {
        Err(NotificationError::NotConfigured(self.reason.clone()))
    }

    async fn send(&self, _token: &str, _message: &PushMessage) -> DeliveryOutcome {
        DeliveryOutcome::failed(self.reason.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlarmType;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn alarm(location: Option<&str>) -> AlarmEvent {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        AlarmEvent {
            id: Uuid::nil(),
            device_id: "dev-1".to_string(),
            user_code: "DEMO01".to_string(),
            smoke: true,
            temperature: Some(34.0),
            battery_ok: true,
            alarm_type: AlarmType::Smoke,
            location: location.map(str::to_string),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            raw_data: serde_json::json!({}),
            occurred_at: at,
            created_at: at,
        }
    }

    #[test]
    fn test_notification_type_display() {
        assert_eq!(NotificationType::SmokeAlarm.to_string(), "smoke_alarm");
        assert_eq!(NotificationType::TestAlarm.to_string(), "test_alarm");
    }

    #[test]
    fn test_smoke_alarm_message() {
        let message = PushMessage::smoke_alarm(&alarm(Some("Kitchen")), "Detector 1");

        assert_eq!(message.title, "Smoke alarm");
        assert_eq!(message.body, "Smoke detected by Detector 1 (Kitchen)");
        assert_eq!(message.data["type"], "smoke_alarm");
        assert_eq!(message.data["deviceId"], "dev-1");
        assert_eq!(message.data["userCode"], "DEMO01");
        assert_eq!(message.data["temperature"], "34");
        assert_eq!(message.data["alarmId"], Uuid::nil().to_string());
    }

    #[test]
    fn test_test_alarm_message_without_location() {
        let mut event = alarm(None);
        event.temperature = None;
        let message = PushMessage::test_alarm(&event, "dev-1");

        assert_eq!(message.notification_type, NotificationType::TestAlarm);
        assert_eq!(message.body, "Test alarm from dev-1");
        assert!(!message.data.contains_key("temperature"));
    }

    #[test]
    fn test_delivery_outcome_constructors() {
        assert!(DeliveryOutcome::delivered().delivered);

        let failed = DeliveryOutcome::failed("timeout");
        assert!(!failed.delivered);
        assert!(!failed.token_invalid);
        assert_eq!(failed.error_reason.as_deref(), Some("timeout"));

        assert!(DeliveryOutcome::invalid_token("UNREGISTERED").token_invalid);
    }

    #[tokio::test]
    async fn test_logging_sink_delivers() {
        let sink = LoggingNotificationSink::new();
        assert!(sink.ensure_configured().is_ok());

        let outcome = sink
            .send("token123", &PushMessage::smoke_alarm(&alarm(None), "dev-1"))
            .await;
        assert!(outcome.delivered);
    }

    #[tokio::test]
    async fn test_unconfigured_sink() {
        let sink = UnconfiguredNotificationSink::new("FCM credentials missing");
        assert_eq!(
            sink.ensure_configured(),
            Err(NotificationError::NotConfigured(
                "FCM credentials missing".to_string()
            ))
        );

        let outcome = sink
            .send("token123", &PushMessage::smoke_alarm(&alarm(None), "dev-1"))
            .await;
        assert!(!outcome.delivered);
    }
}
