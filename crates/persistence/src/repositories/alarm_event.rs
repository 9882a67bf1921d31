//! Alarm event repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{AlarmEvent, AlarmHistoryEntry, AlarmType, NewAlarmEvent};
use domain::repositories::AlarmEventRepository;
use domain::DomainResult;
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;
use crate::entities::{AlarmEventEntity, AlarmHistoryEntity};
use crate::metrics::QueryTimer;

const ALARM_COLUMNS: &str = "id, device_id, user_code, smoke, temperature, battery_ok, \
    alarm_type, location, acknowledged, acknowledged_by, acknowledged_at, raw_data, \
    occurred_at, created_at";

/// Repository for the append-only alarm log.
#[derive(Clone)]
pub struct PostgresAlarmEventRepository {
    pool: PgPool,
}

impl PostgresAlarmEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlarmEventRepository for PostgresAlarmEventRepository {
    async fn insert(&self, alarm: NewAlarmEvent) -> DomainResult<AlarmEvent> {
        let timer = QueryTimer::new("insert_alarm_event");
        let sql = format!(
            r#"
            INSERT INTO alarm_events (
                id, device_id, user_code, smoke, temperature, battery_ok,
                alarm_type, location, raw_data, occurred_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ALARM_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, AlarmEventEntity>(&sql)
            .bind(Uuid::new_v4())
            .bind(&alarm.device_id)
            .bind(&alarm.user_code)
            .bind(alarm.smoke)
            .bind(alarm.temperature)
            .bind(alarm.battery_ok)
            .bind(alarm.alarm_type.as_str())
            .bind(&alarm.location)
            .bind(&alarm.raw_data)
            .bind(alarm.occurred_at)
            .bind(alarm.received_at)
            .fetch_one(&self.pool)
            .await;
        timer.finish(&result);

        AlarmEvent::try_from(result.map_err(db_error("insert_alarm_event"))?)
    }

    async fn latest_for_device(
        &self,
        device_id: &str,
        alarm_type: AlarmType,
    ) -> DomainResult<Option<AlarmEvent>> {
        let timer = QueryTimer::new("latest_alarm_for_device");
        let sql = format!(
            r#"
            SELECT {ALARM_COLUMNS}
            FROM alarm_events
            WHERE device_id = $1 AND alarm_type = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        let result = sqlx::query_as::<_, AlarmEventEntity>(&sql)
            .bind(device_id)
            .bind(alarm_type.as_str())
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);

        result
            .map_err(db_error("latest_alarm_for_device"))?
            .map(AlarmEvent::try_from)
            .transpose()
    }

    async fn list_for_account(
        &self,
        user_code: &str,
        limit: i64,
    ) -> DomainResult<Vec<AlarmHistoryEntry>> {
        let timer = QueryTimer::new("list_alarms_for_account");
        let result = sqlx::query_as::<_, AlarmHistoryEntity>(
            r#"
            SELECT a.id, a.device_id, a.user_code, a.smoke, a.temperature, a.battery_ok,
                   a.alarm_type, a.location, a.acknowledged, a.acknowledged_by,
                   a.acknowledged_at, a.raw_data, a.occurred_at, a.created_at,
                   d.name AS device_name
            FROM alarm_events a
            LEFT JOIN devices d ON d.device_id = a.device_id
            WHERE a.user_code = $1
            ORDER BY a.occurred_at DESC, a.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_code)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        result
            .map_err(db_error("list_alarms_for_account"))?
            .into_iter()
            .map(AlarmHistoryEntry::try_from)
            .collect()
    }

    async fn acknowledge(
        &self,
        user_code: &str,
        alarm_id: Uuid,
        acknowledged_by: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<AlarmEvent>> {
        let timer = QueryTimer::new("acknowledge_alarm");
        // The first acknowledgement is kept; repeats only return the row.
        let sql = format!(
            r#"
            UPDATE alarm_events
            SET acknowledged = TRUE,
                acknowledged_by = CASE WHEN acknowledged THEN acknowledged_by ELSE $3 END,
                acknowledged_at = CASE WHEN acknowledged THEN acknowledged_at ELSE $4 END
            WHERE id = $1 AND user_code = $2
            RETURNING {ALARM_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, AlarmEventEntity>(&sql)
            .bind(alarm_id)
            .bind(user_code)
            .bind(acknowledged_by)
            .bind(at)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);

        result
            .map_err(db_error("acknowledge_alarm"))?
            .map(AlarmEvent::try_from)
            .transpose()
    }
}
