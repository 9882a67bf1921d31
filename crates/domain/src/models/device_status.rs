//! Device status domain model.
//!
//! A device has exactly one status row: the last full observation. It is
//! replaced wholesale on every event and never merged field by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical status produced by the normalizer from any supported payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeviceStatusUpdate {
    pub device_id: String,
    pub online: bool,
    pub smoke: bool,
    pub temperature: Option<f64>,
    /// Battery charge in percent (0-100) when the device reports it.
    pub battery: Option<i32>,
    pub battery_ok: bool,
    /// Signal strength as a positive magnitude (e.g. 62 for -62 dBm).
    pub signal: Option<i32>,
    pub timestamp: DateTime<Utc>,
    /// Original payload, unmodified.
    pub raw_data: serde_json::Value,
}

/// Persisted status snapshot for a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeviceStatus {
    pub device_id: String,
    pub user_code: String,
    pub online: bool,
    pub smoke: bool,
    pub temperature: Option<f64>,
    pub battery: Option<i32>,
    pub battery_ok: bool,
    pub signal: Option<i32>,
    pub last_seen: DateTime<Utc>,
    pub raw_data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl DeviceStatus {
    /// Build the row that replaces any prior status for the device.
    pub fn from_update(user_code: &str, update: &DeviceStatusUpdate, now: DateTime<Utc>) -> Self {
        Self {
            device_id: update.device_id.clone(),
            user_code: user_code.to_string(),
            online: update.online,
            smoke: update.smoke,
            temperature: update.temperature,
            battery: update.battery,
            battery_ok: update.battery_ok,
            signal: update.signal,
            last_seen: update.timestamp,
            raw_data: update.raw_data.clone(),
            updated_at: now,
        }
    }
}

/// Dashboard row: a device owned by the account plus its snapshot, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DeviceStatusView {
    pub device_id: String,
    pub name: String,
    pub online: bool,
    pub smoke: bool,
    pub temperature: Option<f64>,
    pub battery: Option<i32>,
    pub signal: Option<i32>,
    pub last_seen: Option<DateTime<Utc>>,
    pub raw_data: Option<serde_json::Value>,
}

impl DeviceStatusView {
    /// View for a device that has never reported.
    pub fn never_seen(device_id: &str, name: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            name: name.to_string(),
            online: false,
            smoke: false,
            temperature: None,
            battery: None,
            signal: None,
            last_seen: None,
            raw_data: None,
        }
    }

    /// View combining a device name with its persisted status.
    pub fn from_status(name: &str, status: &DeviceStatus) -> Self {
        Self {
            device_id: status.device_id.clone(),
            name: name.to_string(),
            online: status.online,
            smoke: status.smoke,
            temperature: status.temperature,
            battery: status.battery,
            signal: status.signal,
            last_seen: Some(status.last_seen),
            raw_data: Some(status.raw_data.clone()),
        }
    }
}

/// Response for the device status query.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatusResponse {
    pub devices: Vec<DeviceStatusView>,
    pub count: usize,
}

impl From<Vec<DeviceStatusView>> for DeviceStatusResponse {
    fn from(devices: Vec<DeviceStatusView>) -> Self {
        Self {
            count: devices.len(),
            devices,
        }
    }
}
