//! External service integrations.

pub mod fcm;

use std::sync::Arc;
use std::time::Duration;

use domain::services::{LoggingNotificationSink, NotificationSink, UnconfiguredNotificationSink};

use crate::config::{Config, NotificationProvider};

pub use fcm::{FcmError, FcmNotificationSink};

/// Build the push sink selected by `notifications.provider`.
///
/// Broken FCM credentials do not stop the server: the sink reports itself as
/// unconfigured and every alarm fan-out fails with a configuration error.
pub fn notification_sink(config: &Config) -> Arc<dyn NotificationSink> {
    match config.notifications.provider {
        NotificationProvider::Log => {
            tracing::warn!("Push notifications are logged, not sent (provider = log)");
            Arc::new(LoggingNotificationSink::new())
        }
        NotificationProvider::Fcm => {
            let timeout = Duration::from_millis(config.notifications.timeout_ms);
            match FcmNotificationSink::new(config.fcm.clone(), timeout) {
                Ok(sink) => {
                    tracing::info!(project_id = %config.fcm.project_id, "FCM notifications enabled");
                    Arc::new(sink)
                }
                Err(e) => {
                    tracing::error!(operational = true, error = %e, "FCM is not configured");
                    Arc::new(UnconfiguredNotificationSink::new(e.to_string()))
                }
            }
        }
    }
}
