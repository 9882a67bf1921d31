//! Alarm event domain model.
//!
//! Alarm events form an append-only occurrence log. Only the acknowledgement
//! columns change after insertion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::device_status::DeviceStatusUpdate;
use super::Device;

/// Kind of alarm occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmType {
    /// Raised by a device reporting smoke.
    Smoke,
    /// Injected through the manual test trigger.
    Test,
}

impl AlarmType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Test => "test",
        }
    }

    /// Parse from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "smoke" => Some(Self::Smoke),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlarmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlarmType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown alarm type: {}", s))
    }
}

/// A recorded alarm occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AlarmEvent {
    pub id: Uuid,
    pub device_id: String,
    pub user_code: String,
    pub smoke: bool,
    pub temperature: Option<f64>,
    pub battery_ok: bool,
    pub alarm_type: AlarmType,
    pub location: Option<String>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub raw_data: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    /// Server receipt time. Cooldown windows are measured on this clock.
    pub created_at: DateTime<Utc>,
}

/// Alarm event to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlarmEvent {
    pub device_id: String,
    pub user_code: String,
    pub smoke: bool,
    pub temperature: Option<f64>,
    pub battery_ok: bool,
    pub alarm_type: AlarmType,
    pub location: Option<String>,
    pub raw_data: serde_json::Value,
    /// Time reported by the device.
    pub occurred_at: DateTime<Utc>,
    /// Server receipt time, stored as `created_at`.
    pub received_at: DateTime<Utc>,
}

impl NewAlarmEvent {
    /// Smoke alarm derived from a normalized status update.
    pub fn smoke(device: &Device, update: &DeviceStatusUpdate, received_at: DateTime<Utc>) -> Self {
        Self {
            device_id: update.device_id.clone(),
            user_code: device.user_code.clone(),
            smoke: update.smoke,
            temperature: update.temperature,
            battery_ok: update.battery_ok,
            alarm_type: AlarmType::Smoke,
            location: device.location.clone(),
            raw_data: update.raw_data.clone(),
            occurred_at: update.timestamp,
            received_at,
        }
    }

    /// Synthetic alarm injected by the manual test trigger.
    pub fn test(
        device_id: &str,
        user_code: &str,
        location: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.to_string(),
            user_code: user_code.to_string(),
            smoke: false,
            temperature: None,
            battery_ok: true,
            alarm_type: AlarmType::Test,
            location,
            raw_data: serde_json::json!({ "source": "test-alarm", "deviceId": device_id }),
            occurred_at,
            received_at: occurred_at,
        }
    }
}

/// Alarm event joined with the owning device's display name.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmHistoryEntry {
    pub event: AlarmEvent,
    pub device_name: Option<String>,
}

/// Request payload for the alarm history query.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AlarmHistoryRequest {
    #[validate(custom(function = "shared::validation::validate_user_code"))]
    pub user_code: String,

    pub limit: Option<i64>,
}

/// Single alarm history row as exposed to the app.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmHistoryItem {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub device_name: String,
    pub smoke: bool,
    pub temperature: Option<f64>,
    pub battery: bool,
    #[serde(rename = "type")]
    pub alarm_type: AlarmType,
    pub location: Option<String>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl From<AlarmHistoryEntry> for AlarmHistoryItem {
    fn from(entry: AlarmHistoryEntry) -> Self {
        let event = entry.event;
        Self {
            id: event.id,
            timestamp: event.occurred_at,
            device_name: entry.device_name.unwrap_or_else(|| event.device_id.clone()),
            device_id: event.device_id,
            smoke: event.smoke,
            temperature: event.temperature,
            battery: event.battery_ok,
            alarm_type: event.alarm_type,
            location: event.location,
            acknowledged: event.acknowledged,
            acknowledged_at: event.acknowledged_at,
        }
    }
}

/// Response for the alarm history query.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmHistoryResponse {
    pub alarms: Vec<AlarmHistoryItem>,
    pub count: usize,
}

impl From<Vec<AlarmHistoryEntry>> for AlarmHistoryResponse {
    fn from(entries: Vec<AlarmHistoryEntry>) -> Self {
        let alarms: Vec<AlarmHistoryItem> = entries.into_iter().map(Into::into).collect();
        Self {
            count: alarms.len(),
            alarms,
        }
    }
}

/// Request payload for the manual test alarm trigger.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TestAlarmRequest {
    #[validate(custom(function = "shared::validation::validate_user_code"))]
    pub user_code: String,

    #[serde(rename = "deviceId")]
    #[validate(custom(function = "shared::validation::validate_device_id"))]
    pub device_id: String,
}

/// Response for the manual test alarm trigger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAlarmResponse {
    pub success: bool,
    pub device_id: String,
    pub user_code: String,
    pub timestamp: DateTime<Utc>,
}

/// Request payload for acknowledging an alarm.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AcknowledgeAlarmRequest {
    #[validate(custom(function = "shared::validation::validate_user_code"))]
    pub user_code: String,

    #[serde(rename = "alarmId")]
    pub alarm_id: Uuid,

    #[serde(rename = "acknowledgedBy")]
    #[validate(length(max = 100, message = "acknowledgedBy must be at most 100 characters"))]
    pub acknowledged_by: Option<String>,
}

/// Response for an alarm acknowledgement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeAlarmResponse {
    pub success: bool,
    pub alarm_id: Uuid,
    pub acknowledged_at: Option<DateTime<Utc>>,
}
