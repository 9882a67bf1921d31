//! Account-facing operations: login code check, registrations, read paths
//! and alarm acknowledgement.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{
    Account, AlarmEvent, AlarmHistoryEntry, Device, DeviceStatusView, NewDevice, PushToken,
    VerifyCodeResponse,
};
use crate::repositories::Repositories;

pub struct AccountService {
    repos: Repositories,
}

impl AccountService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn require_account(&self, user_code: &str) -> DomainResult<Account> {
        self.repos
            .accounts
            .find_by_code(user_code)
            .await?
            .ok_or_else(|| DomainError::NotFound("Account not found".to_string()))
    }

    /// Check a login code. An unknown code is not an error.
    pub async fn verify_code(&self, user_code: &str) -> DomainResult<VerifyCodeResponse> {
        let Some(account) = self.repos.accounts.find_by_code(user_code).await? else {
            return Ok(VerifyCodeResponse {
                valid: false,
                user_code: user_code.to_string(),
                device_count: 0,
            });
        };
        let device_count = self.repos.devices.count_for_account(&account.user_code).await?;
        Ok(VerifyCodeResponse {
            valid: true,
            user_code: account.user_code,
            device_count,
        })
    }

    /// Bind a device to an account. A device already bound anywhere is a conflict.
    pub async fn register_device(&self, device: NewDevice) -> DomainResult<Device> {
        self.require_account(&device.user_code).await?;

        let device_id = device.device_id.clone();
        let (bound, created) = self.repos.devices.bind_if_absent(device).await?;
        if !created {
            return Err(DomainError::Conflict("Device already registered".to_string()));
        }

        tracing::info!(
            device_id = %device_id,
            user_code = %bound.user_code,
            "Device registered"
        );
        Ok(bound)
    }

    /// Register or re-home a push token. The last registration wins.
    pub async fn register_push_token(
        &self,
        user_code: &str,
        token: &str,
        platform: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<PushToken> {
        self.require_account(user_code).await?;
        let push_token = self
            .repos
            .push_tokens
            .upsert(token, user_code, platform, now)
            .await?;

        tracing::info!(
            user_code = %user_code,
            token = %shared::crypto::token_fingerprint(token),
            platform = %platform,
            "Push token registered"
        );
        Ok(push_token)
    }

    pub async fn device_statuses(&self, user_code: &str) -> DomainResult<Vec<DeviceStatusView>> {
        self.require_account(user_code).await?;
        self.repos.statuses.list_for_account(user_code).await
    }

    /// Alarms of the account, newest first. The limit is clamped to the allowed range.
    pub async fn alarm_history(
        &self,
        user_code: &str,
        limit: Option<i64>,
    ) -> DomainResult<Vec<AlarmHistoryEntry>> {
        self.require_account(user_code).await?;
        let limit = shared::pagination::history_limit(limit);
        self.repos.alarms.list_for_account(user_code, limit).await
    }

    /// Acknowledge an alarm. Repeating it keeps the first acknowledgement.
    pub async fn acknowledge_alarm(
        &self,
        user_code: &str,
        alarm_id: Uuid,
        acknowledged_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<AlarmEvent> {
        let actor = acknowledged_by
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(user_code);

        let alarm = self
            .repos
            .alarms
            .acknowledge(user_code, alarm_id, actor, now)
            .await?
            .ok_or_else(|| DomainError::NotFound("Alarm not found".to_string()))?;

        tracing::info!(
            alarm_id = %alarm_id,
            user_code = %user_code,
            acknowledged_by = ?alarm.acknowledged_by,
            "Alarm acknowledged"
        );
        Ok(alarm)
    }
}
