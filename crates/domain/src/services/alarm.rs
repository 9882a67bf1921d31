//! Alarm detection and recording.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::DomainResult;
use crate::models::{AlarmEvent, AlarmType, Device, DeviceStatusUpdate, NewAlarmEvent};
use crate::repositories::AlarmEventRepository;

/// Result of evaluating one status update.
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmDecision {
    /// A new alarm was written.
    Recorded(AlarmEvent),
    /// The update does not report smoke. Nothing was written.
    NotAlarm,
    /// Smoke was reported within the cooldown window of a previous alarm.
    /// `previous_at` is the receipt time of that alarm.
    Suppressed { previous_at: DateTime<Utc> },
}

pub struct AlarmDetector {
    alarms: Arc<dyn AlarmEventRepository>,
    cooldown: Option<Duration>,
}

impl AlarmDetector {
    /// `cooldown_secs == 0` records every smoke event. Values beyond the range
    /// of a chrono duration also disable the cooldown.
    pub fn new(alarms: Arc<dyn AlarmEventRepository>, cooldown_secs: u64) -> Self {
        let cooldown = i64::try_from(cooldown_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds);
        Self { alarms, cooldown }
    }

    /// An update is alarm-worthy iff it reports smoke.
    pub fn is_alarm_worthy(update: &DeviceStatusUpdate) -> bool {
        update.smoke
    }

    /// Record a smoke alarm for `device` if the update warrants one.
    ///
    /// The cooldown is measured between server receipt times. Device
    /// timestamps are stored but never trusted for suppression, and a
    /// previous alarm received "after" `received_at` is outside the window.
    pub async fn evaluate(
        &self,
        device: &Device,
        update: &DeviceStatusUpdate,
        received_at: DateTime<Utc>,
    ) -> DomainResult<AlarmDecision> {
        if !Self::is_alarm_worthy(update) {
            return Ok(AlarmDecision::NotAlarm);
        }

        if let Some(window) = self.cooldown {
            let previous = self
                .alarms
                .latest_for_device(&device.device_id, AlarmType::Smoke)
                .await?;
            if let Some(previous) = previous {
                let elapsed = received_at.signed_duration_since(previous.created_at);
                if elapsed >= Duration::zero() && elapsed < window {
                    tracing::info!(
                        device_id = %device.device_id,
                        previous_alarm_id = %previous.id,
                        cooldown_secs = window.num_seconds(),
                        "Smoke alarm suppressed by cooldown"
                    );
                    return Ok(AlarmDecision::Suppressed {
                        previous_at: previous.created_at,
                    });
                }
            }
        }

        let alarm = self
            .alarms
            .insert(NewAlarmEvent::smoke(device, update, received_at))
            .await?;
        tracing::warn!(
            alarm_id = %alarm.id,
            device_id = %alarm.device_id,
            user_code = %alarm.user_code,
            temperature = ?alarm.temperature,
            "Smoke alarm recorded"
        );
        Ok(AlarmDecision::Recorded(alarm))
    }
}
