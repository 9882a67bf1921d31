//! Repository ports.
//!
//! Services depend on these traits; the persistence crate provides the
//! Postgres implementations and `testing` provides in-memory ones.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainResult;
use crate::models::{
    Account, AlarmEvent, AlarmHistoryEntry, AlarmType, Device, DeviceStatusUpdate,
    DeviceStatusView, NewAlarmEvent, NewDevice, PushToken,
};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_code(&self, user_code: &str) -> DomainResult<Option<Account>>;

    /// Oldest account by creation time, ties broken by user code.
    async fn first_available(&self) -> DomainResult<Option<Account>>;
}

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn find_by_device_id(&self, device_id: &str) -> DomainResult<Option<Device>>;

    /// Create the binding unless the device is already bound.
    ///
    /// Returns the binding that exists after the call and whether this call
    /// created it. Concurrent callers all observe the same winning binding.
    async fn bind_if_absent(&self, device: NewDevice) -> DomainResult<(Device, bool)>;

    async fn count_for_account(&self, user_code: &str) -> DomainResult<i64>;
}

#[async_trait]
pub trait DeviceStatusRepository: Send + Sync {
    /// Replace the status row for `update.device_id` in a single statement.
    async fn upsert(
        &self,
        user_code: &str,
        update: &DeviceStatusUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<()>;

    /// Every device owned by the account with its latest snapshot, ordered by name.
    async fn list_for_account(&self, user_code: &str) -> DomainResult<Vec<DeviceStatusView>>;
}

#[async_trait]
pub trait AlarmEventRepository: Send + Sync {
    async fn insert(&self, alarm: NewAlarmEvent) -> DomainResult<AlarmEvent>;

    /// Most recent alarm of the given type for a device, by receipt time.
    async fn latest_for_device(
        &self,
        device_id: &str,
        alarm_type: AlarmType,
    ) -> DomainResult<Option<AlarmEvent>>;

    /// Alarms of the account, newest first.
    async fn list_for_account(
        &self,
        user_code: &str,
        limit: i64,
    ) -> DomainResult<Vec<AlarmHistoryEntry>>;

    /// Mark an alarm acknowledged. The first acknowledgement wins.
    ///
    /// Returns `None` when the alarm does not exist or belongs to another account.
    async fn acknowledge(
        &self,
        user_code: &str,
        alarm_id: Uuid,
        acknowledged_by: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<AlarmEvent>>;
}

#[async_trait]
pub trait PushTokenRepository: Send + Sync {
    /// Insert or re-home a token. The last registration wins.
    async fn upsert(
        &self,
        token: &str,
        user_code: &str,
        platform: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<PushToken>;

    async fn list_for_account(&self, user_code: &str) -> DomainResult<Vec<PushToken>>;

    async fn delete(&self, token: &str) -> DomainResult<bool>;
}

/// The full set of repositories the services need.
#[derive(Clone)]
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository>,
    pub devices: Arc<dyn DeviceRepository>,
    pub statuses: Arc<dyn DeviceStatusRepository>,
    pub alarms: Arc<dyn AlarmEventRepository>,
    pub push_tokens: Arc<dyn PushTokenRepository>,
}
