//! Device status normalizer.
//!
//! Different device generations and firmware versions report the same
//! telemetry under different paths. Each canonical field is read by an ordered
//! list of extraction strategies; the first strategy that yields a value wins.
//! Supporting a new payload shape means adding a strategy, not a branch.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{DomainError, DomainResult, DEVICE_ID_REQUIRED};
use crate::models::DeviceStatusUpdate;

/// Battery percentage at or below which the battery is reported as low.
pub const LOW_BATTERY_PERCENT: f64 = 20.0;

/// Cell voltage at or below which the battery is reported as low.
///
/// Only used when the device reports a voltage but no percentage.
pub const LOW_BATTERY_VOLTAGE: f64 = 2.6;

/// Unix timestamps above this are interpreted as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// A pure extraction strategy for one canonical field.
pub type Strategy<T> = fn(&Value) -> Option<T>;

/// Ordered extraction strategies for every canonical field.
#[derive(Clone)]
pub struct StatusNormalizer {
    pub device_id: Vec<Strategy<String>>,
    pub online: Vec<Strategy<bool>>,
    pub smoke: Vec<Strategy<bool>>,
    pub temperature: Vec<Strategy<f64>>,
    pub battery_percent: Vec<Strategy<f64>>,
    pub battery_ok: Vec<Strategy<bool>>,
    pub battery_voltage: Vec<Strategy<f64>>,
    pub signal: Vec<Strategy<f64>>,
    pub timestamp: Vec<Strategy<DateTime<Utc>>>,
}

impl Default for StatusNormalizer {
    fn default() -> Self {
        Self {
            device_id: vec![
                |v| string_at(v, "/deviceId"),
                |v| string_at(v, "/device_id"),
                |v| string_at(v, "/src"),
                |v| string_at(v, "/device/id"),
                |v| string_at(v, "/device/mac"),
            ],
            online: vec![
                |v| bool_at(v, "/online"),
                |v| bool_at(v, "/device/online"),
                |v| bool_at(v, "/params/online"),
            ],
            smoke: vec![
                |v| bool_at(v, "/smoke"),
                |v| bool_at(v, "/device/smoke"),
                |v| bool_at(v, "/smoke:0/alarm"),
                |v| bool_at(v, "/params/smoke:0/alarm"),
            ],
            temperature: vec![
                |v| number_at(v, "/temperature"),
                |v| number_at(v, "/temperature/tC"),
                |v| number_at(v, "/device/temperature"),
                |v| number_at(v, "/temperature:0/tC"),
                |v| number_at(v, "/params/temperature:0/tC"),
                |v| number_at(v, "/tmp/tC"),
            ],
            battery_percent: vec![
                |v| number_at(v, "/battery"),
                |v| number_at(v, "/battery/percent"),
                |v| number_at(v, "/device/battery"),
                |v| number_at(v, "/devicepower:0/battery/percent"),
                |v| number_at(v, "/params/devicepower:0/battery/percent"),
            ],
            battery_ok: vec![
                |v| bool_at(v, "/battery_ok"),
                |v| bool_at(v, "/batteryOk"),
                |v| bool_at(v, "/battery/ok"),
            ],
            battery_voltage: vec![
                |v| number_at(v, "/battery/V"),
                |v| number_at(v, "/battery/voltage"),
                |v| number_at(v, "/devicepower:0/battery/V"),
                |v| number_at(v, "/params/devicepower:0/battery/V"),
            ],
            signal: vec![
                |v| number_at(v, "/signal"),
                |v| number_at(v, "/rssi"),
                |v| number_at(v, "/wifi/rssi"),
                |v| number_at(v, "/device/signal"),
                |v| number_at(v, "/params/wifi/rssi"),
            ],
            timestamp: vec![
                |v| timestamp_at(v, "/timestamp"),
                |v| timestamp_at(v, "/ts"),
                |v| timestamp_at(v, "/params/ts"),
                |v| timestamp_at(v, "/sys/unixtime"),
                |v| timestamp_at(v, "/params/sys/unixtime"),
            ],
        }
    }
}

impl StatusNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract only the device identifier.
    pub fn device_id(&self, raw: &Value) -> Option<String> {
        first(&self.device_id, raw)
    }

    /// Convert a raw vendor payload into the canonical status update.
    ///
    /// Only a missing or invalid device identifier is an error; every other
    /// field has a default. `received_at` stands in for a missing payload
    /// timestamp.
    pub fn normalize(
        &self,
        raw: &Value,
        received_at: DateTime<Utc>,
    ) -> DomainResult<DeviceStatusUpdate> {
        let device_id = self
            .device_id(raw)
            .ok_or_else(|| DomainError::MalformedPayload(DEVICE_ID_REQUIRED.to_string()))?;
        shared::validation::validate_device_id(&device_id).map_err(|e| {
            DomainError::MalformedPayload(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| DEVICE_ID_REQUIRED.to_string()),
            )
        })?;

        let battery_percent = first(&self.battery_percent, raw).map(|p| p.clamp(0.0, 100.0));
        let battery_ok = first(&self.battery_ok, raw)
            .or_else(|| battery_percent.map(|p| p > LOW_BATTERY_PERCENT))
            .or_else(|| first(&self.battery_voltage, raw).map(|v| v > LOW_BATTERY_VOLTAGE))
            .unwrap_or(true);

        Ok(DeviceStatusUpdate {
            device_id,
            // The device reached us, so it is online unless it says otherwise.
            online: first(&self.online, raw).unwrap_or(true),
            smoke: first(&self.smoke, raw).unwrap_or(false),
            temperature: first(&self.temperature, raw),
            battery: battery_percent.map(|p| p.round() as i32),
            battery_ok,
            signal: first(&self.signal, raw).map(|s| s.abs().round() as i32),
            timestamp: first(&self.timestamp, raw).unwrap_or(received_at),
            raw_data: raw.clone(),
        })
    }
}

fn first<T>(strategies: &[Strategy<T>], raw: &Value) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(raw))
}

fn string_at(raw: &Value, pointer: &str) -> Option<String> {
    raw.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn bool_at(raw: &Value, pointer: &str) -> Option<bool> {
    match raw.pointer(pointer)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn number_at(raw: &Value, pointer: &str) -> Option<f64> {
    let n = match raw.pointer(pointer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn timestamp_at(raw: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    match raw.pointer(pointer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let n = n.as_f64()?;
            if !n.is_finite() || n <= 0.0 {
                return None;
            }
            let millis = if n > MILLIS_THRESHOLD { n } else { n * 1000.0 };
            Utc.timestamp_millis_opt(millis.round() as i64).single()
        }
        _ => None,
    }
}
