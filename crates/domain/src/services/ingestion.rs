//! Device event ingestion pipeline.
//!
//! normalize -> resolve -> status upsert -> alarm evaluation -> fan-out.
//! Stages run in order and are not transactional: a later failure never
//! undoes an earlier write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};
use crate::models::{AlarmEvent, NewAlarmEvent};
use crate::repositories::{
    AccountRepository, AlarmEventRepository, DeviceRepository, DeviceStatusRepository,
    Repositories,
};
use crate::services::alarm::{AlarmDecision, AlarmDetector};
use crate::services::fanout::{FanoutConfig, FanoutResult, NotificationFanout};
use crate::services::normalizer::StatusNormalizer;
use crate::services::notification::{NotificationSink, PushMessage};
use crate::services::resolver::{DeviceIdentityResolver, UnknownDevicePolicy};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionConfig {
    pub unknown_device_policy: UnknownDevicePolicy,
    /// Zero disables the cooldown.
    pub alarm_cooldown_secs: u64,
    pub fanout: FanoutConfig,
}

/// What happened in the alarm stage of one event.
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmStage {
    NotAlarm,
    Recorded {
        alarm: AlarmEvent,
        notifications: FanoutResult,
    },
    Suppressed,
    /// The alarm was written but its recipients could not be loaded, so
    /// nothing was sent.
    Unnotified { alarm: AlarmEvent, reason: String },
    /// The alarm could not be written. The status write still stands.
    Failed { reason: String },
}

/// Result of ingesting one device event.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub device_id: String,
    pub user_code: String,
    /// The device was bound to an account by this event.
    pub adopted: bool,
    pub alarm: AlarmStage,
}

impl IngestOutcome {
    pub fn alarm_recorded(&self) -> bool {
        matches!(
            self.alarm,
            AlarmStage::Recorded { .. } | AlarmStage::Unnotified { .. }
        )
    }

    /// Delivery counts for a recorded alarm. Zero when nothing could be sent.
    pub fn notifications(&self) -> Option<FanoutResult> {
        match &self.alarm {
            AlarmStage::Recorded { notifications, .. } => Some(notifications.clone()),
            AlarmStage::Unnotified { .. } => Some(FanoutResult::default()),
            _ => None,
        }
    }

    /// Client-facing note for a partially successful event.
    pub fn warning(&self) -> Option<&'static str> {
        match &self.alarm {
            AlarmStage::Failed { .. } => Some("Status saved but alarm could not be recorded"),
            AlarmStage::Unnotified { .. } => Some("Alarm recorded but notifications could not be sent"),
            AlarmStage::Suppressed => Some("Alarm suppressed by cooldown"),
            _ => None,
        }
    }
}

/// Result of a manual test alarm.
#[derive(Debug, Clone, PartialEq)]
pub struct TestAlarmOutcome {
    pub alarm: AlarmEvent,
    pub notifications: FanoutResult,
}

pub struct IngestionService {
    normalizer: StatusNormalizer,
    resolver: DeviceIdentityResolver,
    detector: AlarmDetector,
    fanout: NotificationFanout,
    accounts: Arc<dyn AccountRepository>,
    devices: Arc<dyn DeviceRepository>,
    statuses: Arc<dyn DeviceStatusRepository>,
    alarms: Arc<dyn AlarmEventRepository>,
}

impl IngestionService {
    pub fn new(
        repos: &Repositories,
        sink: Arc<dyn NotificationSink>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            normalizer: StatusNormalizer::new(),
            resolver: DeviceIdentityResolver::new(
                repos.accounts.clone(),
                repos.devices.clone(),
                config.unknown_device_policy,
            ),
            detector: AlarmDetector::new(repos.alarms.clone(), config.alarm_cooldown_secs),
            fanout: NotificationFanout::new(repos.push_tokens.clone(), sink, config.fanout),
            accounts: repos.accounts.clone(),
            devices: repos.devices.clone(),
            statuses: repos.statuses.clone(),
            alarms: repos.alarms.clone(),
        }
    }

    /// Replace the default normalizer, e.g. to add strategies for a new firmware.
    pub fn with_normalizer(mut self, normalizer: StatusNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn notification_provider(&self) -> &'static str {
        self.fanout.provider()
    }

    pub fn notifications_configured(&self) -> bool {
        self.fanout.is_configured()
    }

    /// Process one inbound device event.
    pub async fn ingest(&self, raw: &Value, received_at: DateTime<Utc>) -> DomainResult<IngestOutcome> {
        let update = self.normalizer.normalize(raw, received_at)?;
        let resolution = self.resolver.resolve(&update.device_id).await?;
        let device = resolution.device;

        self.statuses
            .upsert(&device.user_code, &update, received_at)
            .await?;

        tracing::debug!(
            device_id = %device.device_id,
            user_code = %device.user_code,
            online = update.online,
            smoke = update.smoke,
            "Device status updated"
        );

        let alarm = match self.detector.evaluate(&device, &update, received_at).await {
            Ok(AlarmDecision::NotAlarm) => AlarmStage::NotAlarm,
            Ok(AlarmDecision::Suppressed { .. }) => AlarmStage::Suppressed,
            Ok(AlarmDecision::Recorded(alarm)) => {
                let message = PushMessage::smoke_alarm(&alarm, &device.name);
                match self.fanout.notify_account(&device.user_code, &message).await {
                    Ok(notifications) => AlarmStage::Recorded {
                        alarm,
                        notifications,
                    },
                    Err(e @ DomainError::Configuration(_)) => return Err(e),
                    Err(e) => {
                        tracing::error!(
                            alarm_id = %alarm.id,
                            device_id = %device.device_id,
                            user_code = %device.user_code,
                            error = %e,
                            "Smoke alarm recorded but notifications could not be sent"
                        );
                        AlarmStage::Unnotified {
                            alarm,
                            reason: e.to_string(),
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(
                    device_id = %device.device_id,
                    user_code = %device.user_code,
                    error = %e,
                    "Failed to record smoke alarm, status was saved"
                );
                AlarmStage::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(IngestOutcome {
            device_id: device.device_id,
            user_code: device.user_code,
            adopted: resolution.adopted,
            alarm,
        })
    }

    /// Inject a synthetic test alarm and notify the account.
    ///
    /// Bypasses the alarm detector. A device bound to a different account is
    /// refused; an unbound device is accepted without creating a binding.
    pub async fn trigger_test_alarm(
        &self,
        user_code: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<TestAlarmOutcome> {
        if self.accounts.find_by_code(user_code).await?.is_none() {
            return Err(DomainError::NotFound("Account not found".to_string()));
        }

        let device = self.devices.find_by_device_id(device_id).await?;
        if let Some(device) = &device {
            if device.user_code != user_code {
                tracing::warn!(
                    device_id = %device_id,
                    user_code = %user_code,
                    "Test alarm refused for device owned by another account"
                );
                return Err(DomainError::Forbidden(
                    "Device belongs to another account".to_string(),
                ));
            }
        }

        let location = device.as_ref().and_then(|d| d.location.clone());
        let device_name = device
            .as_ref()
            .map(|d| d.name.clone())
            .unwrap_or_else(|| device_id.to_string());

        let alarm = self
            .alarms
            .insert(NewAlarmEvent::test(device_id, user_code, location, now))
            .await?;
        tracing::info!(
            alarm_id = %alarm.id,
            device_id = %device_id,
            user_code = %user_code,
            "Test alarm recorded"
        );

        let notifications = self
            .fanout
            .notify_account(user_code, &PushMessage::test_alarm(&alarm, &device_name))
            .await?;

        Ok(TestAlarmOutcome {
            alarm,
            notifications,
        })
    }
}
