//! Device repository for database operations.

use async_trait::async_trait;
use domain::models::{Device, NewDevice};
use domain::repositories::DeviceRepository;
use domain::{DomainError, DomainResult};
use sqlx::PgPool;

use super::db_error;
use crate::entities::DeviceEntity;
use crate::metrics::QueryTimer;

/// Repository for device ownership bindings.
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    pool: PgPool,
}

impl PostgresDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn find_by_device_id(&self, device_id: &str) -> DomainResult<Option<Device>> {
        let timer = QueryTimer::new("find_device_by_device_id");
        let result = sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT device_id, user_code, name, location, created_at
            FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result.map_err(db_error("find_device_by_device_id"))?.map(Into::into))
    }

    async fn bind_if_absent(&self, device: NewDevice) -> DomainResult<(Device, bool)> {
        let timer = QueryTimer::new("bind_device_if_absent");
        let result = sqlx::query_as::<_, DeviceEntity>(
            r#"
            INSERT INTO devices (device_id, user_code, name, location)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (device_id) DO NOTHING
            RETURNING device_id, user_code, name, location, created_at
            "#,
        )
        .bind(&device.device_id)
        .bind(&device.user_code)
        .bind(&device.name)
        .bind(&device.location)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);

        if let Some(entity) = result.map_err(db_error("bind_device_if_absent"))? {
            return Ok((entity.into(), true));
        }

        // Lost the race or already bound: the existing row is authoritative.
        let existing = self
            .find_by_device_id(&device.device_id)
            .await?
            .ok_or_else(|| {
                DomainError::Persistence(format!(
                    "device {} vanished after conflicting insert",
                    device.device_id
                ))
            })?;
        Ok((existing, false))
    }

    async fn count_for_account(&self, user_code: &str) -> DomainResult<i64> {
        let timer = QueryTimer::new("count_devices_for_account");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM devices WHERE user_code = $1
            "#,
        )
        .bind(user_code)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);

        result.map_err(db_error("count_devices_for_account"))
    }
}
