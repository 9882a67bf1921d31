//! Device status repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{DeviceStatusUpdate, DeviceStatusView};
use domain::repositories::DeviceStatusRepository;
use domain::DomainResult;
use sqlx::PgPool;

use super::db_error;
use crate::entities::DeviceStatusViewEntity;
use crate::metrics::QueryTimer;

/// Repository for the per-device status snapshot.
#[derive(Clone)]
pub struct PostgresDeviceStatusRepository {
    pool: PgPool,
}

impl PostgresDeviceStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStatusRepository for PostgresDeviceStatusRepository {
    async fn upsert(
        &self,
        user_code: &str,
        update: &DeviceStatusUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let timer = QueryTimer::new("upsert_device_status");
        // Every column is overwritten; nothing from the previous row survives.
        let result = sqlx::query(
            r#"
            INSERT INTO device_status (
                device_id, user_code, online, smoke, temperature, battery,
                battery_ok, signal, last_seen, raw_data, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (device_id) DO UPDATE SET
                user_code = EXCLUDED.user_code,
                online = EXCLUDED.online,
                smoke = EXCLUDED.smoke,
                temperature = EXCLUDED.temperature,
                battery = EXCLUDED.battery,
                battery_ok = EXCLUDED.battery_ok,
                signal = EXCLUDED.signal,
                last_seen = EXCLUDED.last_seen,
                raw_data = EXCLUDED.raw_data,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&update.device_id)
        .bind(user_code)
        .bind(update.online)
        .bind(update.smoke)
        .bind(update.temperature)
        .bind(update.battery)
        .bind(update.battery_ok)
        .bind(update.signal)
        .bind(update.timestamp)
        .bind(&update.raw_data)
        .bind(now)
        .execute(&self.pool)
        .await;
        timer.finish(&result);

        result.map_err(db_error("upsert_device_status"))?;
        Ok(())
    }

    async fn list_for_account(&self, user_code: &str) -> DomainResult<Vec<DeviceStatusView>> {
        let timer = QueryTimer::new("list_device_status_for_account");
        let result = sqlx::query_as::<_, DeviceStatusViewEntity>(
            r#"
            SELECT d.device_id, d.name, s.online, s.smoke, s.temperature,
                   s.battery, s.signal, s.last_seen, s.raw_data
            FROM devices d
            LEFT JOIN device_status s ON s.device_id = d.device_id
            WHERE d.user_code = $1
            ORDER BY d.name ASC, d.device_id ASC
            "#,
        )
        .bind(user_code)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        let entities = result.map_err(db_error("list_device_status_for_account"))?;
        Ok(entities.into_iter().map(Into::into).collect())
    }
}
