//! Alarm endpoint handlers: manual test trigger, history and acknowledgement.

use axum::{extract::State, Json};
use chrono::Utc;
use domain::models::alarm_event::{
    AcknowledgeAlarmRequest, AcknowledgeAlarmResponse, AlarmHistoryRequest, AlarmHistoryResponse,
    TestAlarmRequest, TestAlarmResponse,
};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ApiJson;
use crate::middleware::metrics::{record_alarm_recorded, record_push_deliveries};

/// Record a test alarm and notify every client of the account.
///
/// POST /test-alarm
pub async fn test_alarm(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TestAlarmRequest>,
) -> Result<Json<TestAlarmResponse>, ApiError> {
    request.validate()?;

    let outcome = state
        .ingestion
        .trigger_test_alarm(&request.user_code, &request.device_id, Utc::now())
        .await?;

    record_alarm_recorded(outcome.alarm.alarm_type);
    record_push_deliveries(&outcome.notifications);

    Ok(Json(TestAlarmResponse {
        success: true,
        device_id: outcome.alarm.device_id,
        user_code: outcome.alarm.user_code,
        timestamp: outcome.alarm.occurred_at,
    }))
}

/// Alarms of an account, newest first.
///
/// POST /alarm-history
pub async fn alarm_history(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AlarmHistoryRequest>,
) -> Result<Json<AlarmHistoryResponse>, ApiError> {
    request.validate()?;

    let entries = state
        .accounts
        .alarm_history(&request.user_code, request.limit)
        .await?;

    Ok(Json(entries.into()))
}

/// Acknowledge an alarm of the account.
///
/// POST /acknowledge-alarm
pub async fn acknowledge_alarm(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AcknowledgeAlarmRequest>,
) -> Result<Json<AcknowledgeAlarmResponse>, ApiError> {
    request.validate()?;

    let alarm = state
        .accounts
        .acknowledge_alarm(
            &request.user_code,
            request.alarm_id,
            request.acknowledged_by.as_deref(),
            Utc::now(),
        )
        .await?;

    Ok(Json(AcknowledgeAlarmResponse {
        success: true,
        alarm_id: alarm.id,
        acknowledged_at: alarm.acknowledged_at,
    }))
}
