//! Alarm event entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AlarmEvent, AlarmHistoryEntry, AlarmType};
use domain::DomainError;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the alarm_events table.
#[derive(Debug, Clone, FromRow)]
pub struct AlarmEventEntity {
    pub id: Uuid,
    pub device_id: String,
    pub user_code: String,
    pub smoke: bool,
    pub temperature: Option<f64>,
    pub battery_ok: bool,
    pub alarm_type: String,
    pub location: Option<String>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub raw_data: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AlarmEventEntity> for AlarmEvent {
    type Error = DomainError;

    fn try_from(entity: AlarmEventEntity) -> Result<Self, Self::Error> {
        let alarm_type = AlarmType::parse(&entity.alarm_type).ok_or_else(|| {
            DomainError::Persistence(format!("unknown alarm type: {}", entity.alarm_type))
        })?;

        Ok(Self {
            id: entity.id,
            device_id: entity.device_id,
            user_code: entity.user_code,
            smoke: entity.smoke,
            temperature: entity.temperature,
            battery_ok: entity.battery_ok,
            alarm_type,
            location: entity.location,
            acknowledged: entity.acknowledged,
            acknowledged_by: entity.acknowledged_by,
            acknowledged_at: entity.acknowledged_at,
            raw_data: entity.raw_data,
            occurred_at: entity.occurred_at,
            created_at: entity.created_at,
        })
    }
}

/// Alarm row joined with the device name (null when the device is unbound).
#[derive(Debug, Clone, FromRow)]
pub struct AlarmHistoryEntity {
    #[sqlx(flatten)]
    pub event: AlarmEventEntity,
    pub device_name: Option<String>,
}

impl TryFrom<AlarmHistoryEntity> for AlarmHistoryEntry {
    type Error = DomainError;

    fn try_from(entity: AlarmHistoryEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            event: entity.event.try_into()?,
            device_name: entity.device_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(alarm_type: &str) -> AlarmEventEntity {
        AlarmEventEntity {
            id: Uuid::new_v4(),
            device_id: "dev-1".to_string(),
            user_code: "DEMO01".to_string(),
            smoke: true,
            temperature: Some(34.0),
            battery_ok: true,
            alarm_type: alarm_type.to_string(),
            location: None,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            raw_data: serde_json::json!({"deviceId": "dev-1"}),
            occurred_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_alarm_entity_to_domain() {
        let event: AlarmEvent = entity("smoke").try_into().unwrap();
        assert_eq!(event.alarm_type, AlarmType::Smoke);
        assert_eq!(event.temperature, Some(34.0));
    }

    #[test]
    fn test_unknown_alarm_type_is_persistence_error() {
        let result: Result<AlarmEvent, _> = entity("fire").try_into();
        assert!(matches!(result, Err(DomainError::Persistence(_))));
    }

    #[test]
    fn test_history_entity_keeps_device_name() {
        let entry: AlarmHistoryEntry = AlarmHistoryEntity {
            event: entity("test"),
            device_name: Some("Kitchen".to_string()),
        }
        .try_into()
        .unwrap();
        assert_eq!(entry.event.alarm_type, AlarmType::Test);
        assert_eq!(entry.device_name.as_deref(), Some("Kitchen"));
    }
}
