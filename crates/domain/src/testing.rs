//! In-memory adapters for tests.
//!
//! `InMemoryStore` implements every repository port over a single lock, so
//! the same store can back the domain service tests and the API router tests.
//! `ScriptedSink` is a notification sink whose per-token behavior is scripted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{
    Account, AlarmEvent, AlarmHistoryEntry, AlarmType, Device, DeviceStatus, DeviceStatusUpdate,
    DeviceStatusView, NewAlarmEvent, NewDevice, PushToken,
};
use crate::repositories::{
    AccountRepository, AlarmEventRepository, DeviceRepository, DeviceStatusRepository,
    PushTokenRepository, Repositories,
};
use crate::services::notification::{
    DeliveryOutcome, NotificationError, NotificationSink, PushMessage,
};

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    devices: BTreeMap<String, Device>,
    statuses: BTreeMap<String, DeviceStatus>,
    alarms: Vec<AlarmEvent>,
    push_tokens: BTreeMap<String, PushToken>,
    fail_status_writes: bool,
    fail_alarm_writes: bool,
    fail_token_reads: bool,
}

/// In-memory implementation of all repository ports.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Repository bundle backed by this store.
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            accounts: self.clone(),
            devices: self.clone(),
            statuses: self.clone(),
            alarms: self.clone(),
            push_tokens: self.clone(),
        }
    }

    /// Add an account. Accounts are created one second apart in insertion order.
    pub async fn add_account(&self, user_code: &str) -> Account {
        let mut state = self.state.write().await;
        let created_at = base_time() + chrono::Duration::seconds(state.accounts.len() as i64);
        let account = Account {
            user_code: user_code.to_string(),
            name: None,
            created_at,
        };
        state.accounts.push(account.clone());
        account
    }

    pub async fn add_account_at(&self, user_code: &str, created_at: DateTime<Utc>) -> Account {
        let account = Account {
            user_code: user_code.to_string(),
            name: None,
            created_at,
        };
        self.state.write().await.accounts.push(account.clone());
        account
    }

    pub async fn add_device(
        &self,
        device_id: &str,
        user_code: &str,
        name: &str,
        location: Option<&str>,
    ) -> Device {
        let device = Device {
            device_id: device_id.to_string(),
            user_code: user_code.to_string(),
            name: name.to_string(),
            location: location.map(str::to_string),
            created_at: base_time(),
        };
        self.state
            .write()
            .await
            .devices
            .insert(device_id.to_string(), device.clone());
        device
    }

    pub async fn add_push_token(&self, token: &str, user_code: &str) {
        let now = base_time();
        self.state.write().await.push_tokens.insert(
            token.to_string(),
            PushToken {
                token: token.to_string(),
                user_code: user_code.to_string(),
                platform: "android".to_string(),
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub async fn device(&self, device_id: &str) -> Option<Device> {
        self.state.read().await.devices.get(device_id).cloned()
    }

    pub async fn device_count(&self) -> usize {
        self.state.read().await.devices.len()
    }

    pub async fn status(&self, device_id: &str) -> Option<DeviceStatus> {
        self.state.read().await.statuses.get(device_id).cloned()
    }

    pub async fn status_count(&self) -> usize {
        self.state.read().await.statuses.len()
    }

    pub async fn alarms(&self) -> Vec<AlarmEvent> {
        self.state.read().await.alarms.clone()
    }

    pub async fn push_tokens(&self) -> Vec<PushToken> {
        self.state.read().await.push_tokens.values().cloned().collect()
    }

    /// Make every status upsert fail with a persistence error.
    pub async fn fail_status_writes(&self, fail: bool) {
        self.state.write().await.fail_status_writes = fail;
    }

    /// Make every alarm insert fail with a persistence error.
    pub async fn fail_alarm_writes(&self, fail: bool) {
        self.state.write().await.fail_alarm_writes = fail;
    }

    /// Make every push token lookup fail with a persistence error.
    pub async fn fail_token_reads(&self, fail: bool) {
        self.state.write().await.fail_token_reads = fail;
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn find_by_code(&self, user_code: &str) -> DomainResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .find(|a| a.user_code == user_code)
            .cloned())
    }

    async fn first_available(&self) -> DomainResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .min_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.user_code.cmp(&b.user_code))
            })
            .cloned())
    }
}

#[async_trait]
impl DeviceRepository for InMemoryStore {
    async fn find_by_device_id(&self, device_id: &str) -> DomainResult<Option<Device>> {
        Ok(self.state.read().await.devices.get(device_id).cloned())
    }

    async fn bind_if_absent(&self, device: NewDevice) -> DomainResult<(Device, bool)> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.devices.get(&device.device_id) {
            return Ok((existing.clone(), false));
        }
        let bound = Device {
            device_id: device.device_id.clone(),
            user_code: device.user_code,
            name: device.name,
            location: device.location,
            created_at: Utc::now(),
        };
        state.devices.insert(device.device_id, bound.clone());
        Ok((bound, true))
    }

    async fn count_for_account(&self, user_code: &str) -> DomainResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .values()
            .filter(|d| d.user_code == user_code)
            .count() as i64)
    }
}

#[async_trait]
impl DeviceStatusRepository for InMemoryStore {
    async fn upsert(
        &self,
        user_code: &str,
        update: &DeviceStatusUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state.fail_status_writes {
            return Err(DomainError::Persistence("status write failed".to_string()));
        }
        state.statuses.insert(
            update.device_id.clone(),
            DeviceStatus::from_update(user_code, update, now),
        );
        Ok(())
    }

    async fn list_for_account(&self, user_code: &str) -> DomainResult<Vec<DeviceStatusView>> {
        let state = self.state.read().await;
        let mut devices: Vec<&Device> = state
            .devices
            .values()
            .filter(|d| d.user_code == user_code)
            .collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.device_id.cmp(&b.device_id)));

        Ok(devices
            .into_iter()
            .map(|device| match state.statuses.get(&device.device_id) {
                Some(status) => DeviceStatusView::from_status(&device.name, status),
                None => DeviceStatusView::never_seen(&device.device_id, &device.name),
            })
            .collect())
    }
}

#[async_trait]
impl AlarmEventRepository for InMemoryStore {
    async fn insert(&self, alarm: NewAlarmEvent) -> DomainResult<AlarmEvent> {
        let mut state = self.state.write().await;
        if state.fail_alarm_writes {
            return Err(DomainError::Persistence("alarm write failed".to_string()));
        }
        let event = AlarmEvent {
            id: Uuid::new_v4(),
            device_id: alarm.device_id,
            user_code: alarm.user_code,
            smoke: alarm.smoke,
            temperature: alarm.temperature,
            battery_ok: alarm.battery_ok,
            alarm_type: alarm.alarm_type,
            location: alarm.location,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            raw_data: alarm.raw_data,
            occurred_at: alarm.occurred_at,
            created_at: alarm.received_at,
        };
        state.alarms.push(event.clone());
        Ok(event)
    }

    async fn latest_for_device(
        &self,
        device_id: &str,
        alarm_type: AlarmType,
    ) -> DomainResult<Option<AlarmEvent>> {
        let state = self.state.read().await;
        Ok(state
            .alarms
            .iter()
            .filter(|a| a.device_id == device_id && a.alarm_type == alarm_type)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn list_for_account(
        &self,
        user_code: &str,
        limit: i64,
    ) -> DomainResult<Vec<AlarmHistoryEntry>> {
        let state = self.state.read().await;
        let mut alarms: Vec<&AlarmEvent> = state
            .alarms
            .iter()
            .filter(|a| a.user_code == user_code)
            .collect();
        alarms.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(alarms
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|event| AlarmHistoryEntry {
                device_name: state.devices.get(&event.device_id).map(|d| d.name.clone()),
                event: event.clone(),
            })
            .collect())
    }

    async fn acknowledge(
        &self,
        user_code: &str,
        alarm_id: Uuid,
        acknowledged_by: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<AlarmEvent>> {
        let mut state = self.state.write().await;
        let Some(alarm) = state
            .alarms
            .iter_mut()
            .find(|a| a.id == alarm_id && a.user_code == user_code)
        else {
            return Ok(None);
        };
        if !alarm.acknowledged {
            alarm.acknowledged = true;
            alarm.acknowledged_by = Some(acknowledged_by.to_string());
            alarm.acknowledged_at = Some(at);
        }
        Ok(Some(alarm.clone()))
    }
}

#[async_trait]
impl PushTokenRepository for InMemoryStore {
    async fn upsert(
        &self,
        token: &str,
        user_code: &str,
        platform: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<PushToken> {
        let mut state = self.state.write().await;
        let created_at = state
            .push_tokens
            .get(token)
            .map(|t| t.created_at)
            .unwrap_or(now);
        let push_token = PushToken {
            token: token.to_string(),
            user_code: user_code.to_string(),
            platform: platform.to_string(),
            created_at,
            updated_at: now,
        };
        state
            .push_tokens
            .insert(token.to_string(), push_token.clone());
        Ok(push_token)
    }

    async fn list_for_account(&self, user_code: &str) -> DomainResult<Vec<PushToken>> {
        let state = self.state.read().await;
        if state.fail_token_reads {
            return Err(DomainError::Persistence("push token read failed".to_string()));
        }
        Ok(state
            .push_tokens
            .values()
            .filter(|t| t.user_code == user_code)
            .cloned()
            .collect())
    }

    async fn delete(&self, token: &str) -> DomainResult<bool> {
        Ok(self.state.write().await.push_tokens.remove(token).is_some())
    }
}

/// Notification sink with scripted per-token behavior.
///
/// Tokens deliver successfully unless marked failing, invalid or slow.
#[derive(Default)]
pub struct ScriptedSink {
    failing: HashSet<String>,
    invalid: HashSet<String>,
    slow: HashMap<String, Duration>,
    unconfigured: bool,
    sent: Mutex<Vec<(String, PushMessage)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_token(mut self, token: &str) -> Self {
        self.failing.insert(token.to_string());
        self
    }

    pub fn invalid_token(mut self, token: &str) -> Self {
        self.invalid.insert(token.to_string());
        self
    }

    pub fn slow_token(mut self, token: &str, delay: Duration) -> Self {
        self.slow.insert(token.to_string(), delay);
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.unconfigured = true;
        self
    }

    /// Every send attempt, in completion order.
    pub async fn sent(&self) -> Vec<(String, PushMessage)> {
        self.sent.lock().await.clone()
    }

    /// Highest number of sends observed in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for ScriptedSink {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    fn ensure_configured(&self) -> Result<(), NotificationError> {
        if self.unconfigured {
            return Err(NotificationError::NotConfigured(
                "credentials missing".to_string(),
            ));
        }
        Ok(())
    }

    async fn send(&self, token: &str, message: &PushMessage) -> DeliveryOutcome {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.slow.get(token) {
            tokio::time::sleep(*delay).await;
        }
        // Yield so concurrent sends overlap even without a delay.
        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.sent
            .lock()
            .await
            .push((token.to_string(), message.clone()));

        if self.invalid.contains(token) {
            DeliveryOutcome::invalid_token("UNREGISTERED")
        } else if self.failing.contains(token) {
            DeliveryOutcome::failed("provider rejected the request")
        } else {
            DeliveryOutcome::delivered()
        }
    }
}
