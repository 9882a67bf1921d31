//! Device webhook endpoint.
//!
//! Field devices post status and smoke events here. The body is parsed as
//! JSON regardless of content type; payload shape detection happens in the
//! ingestion pipeline.

use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use domain::services::{AlarmStage, FanoutResult, IngestOutcome};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::parse_payload;
use crate::middleware::metrics::{
    record_alarm_recorded, record_alarm_suppressed, record_device_adopted, record_device_event,
    record_push_deliveries,
};

/// Response for an accepted device event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEventResponse {
    pub success: bool,
    pub device_id: String,
    pub alarm_recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<FanoutResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<IngestOutcome> for DeviceEventResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            success: true,
            alarm_recorded: outcome.alarm_recorded(),
            notifications: outcome.notifications(),
            warning: outcome.warning().map(str::to_string),
            device_id: outcome.device_id,
        }
    }
}

fn record_outcome(outcome: &IngestOutcome) {
    record_device_event("accepted");
    if outcome.adopted {
        record_device_adopted();
    }
    match &outcome.alarm {
        AlarmStage::Recorded {
            alarm,
            notifications,
        } => {
            record_alarm_recorded(alarm.alarm_type);
            record_push_deliveries(notifications);
        }
        AlarmStage::Unnotified { alarm, .. } => record_alarm_recorded(alarm.alarm_type),
        AlarmStage::Suppressed => record_alarm_suppressed(),
        AlarmStage::NotAlarm | AlarmStage::Failed { .. } => {}
    }
}

/// Ingest one device event.
///
/// POST /webhook/device-event
pub async fn device_event(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DeviceEventResponse>, ApiError> {
    let result = match parse_payload(&body) {
        Ok(raw) => state
            .ingestion
            .ingest(&raw, Utc::now())
            .await
            .map_err(ApiError::from),
        Err(e) => Err(e),
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            record_device_event("error");
            tracing::warn!(error = %e, "Device event not ingested");
            return Err(e);
        }
    };

    record_outcome(&outcome);

    if let AlarmStage::Recorded {
        alarm,
        notifications,
    } = &outcome.alarm
    {
        tracing::info!(
            alarm_id = %alarm.id,
            device_id = %outcome.device_id,
            user_code = %outcome.user_code,
            attempted = notifications.attempted,
            succeeded = notifications.succeeded,
            failed = notifications.failed,
            "Smoke alarm processed"
        );
    }

    Ok(Json(outcome.into()))
}
