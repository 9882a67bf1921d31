//! Device status entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A device joined with its status row, if it has one.
///
/// Status columns are null for devices that have never reported.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceStatusViewEntity {
    pub device_id: String,
    pub name: String,
    pub online: Option<bool>,
    pub smoke: Option<bool>,
    pub temperature: Option<f64>,
    pub battery: Option<i32>,
    pub signal: Option<i32>,
    pub last_seen: Option<DateTime<Utc>>,
    pub raw_data: Option<serde_json::Value>,
}

impl From<DeviceStatusViewEntity> for domain::models::DeviceStatusView {
    fn from(entity: DeviceStatusViewEntity) -> Self {
        Self {
            device_id: entity.device_id,
            name: entity.name,
            online: entity.online.unwrap_or(false),
            smoke: entity.smoke.unwrap_or(false),
            temperature: entity.temperature,
            battery: entity.battery,
            signal: entity.signal,
            last_seen: entity.last_seen,
            raw_data: entity.raw_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_reported_device_maps_to_offline() {
        let entity = DeviceStatusViewEntity {
            device_id: "dev-1".to_string(),
            name: "Kitchen".to_string(),
            online: None,
            smoke: None,
            temperature: None,
            battery: None,
            signal: None,
            last_seen: None,
            raw_data: None,
        };

        let view: domain::models::DeviceStatusView = entity.into();
        assert_eq!(
            view,
            domain::models::DeviceStatusView::never_seen("dev-1", "Kitchen")
        );
    }
}
