//! Device endpoint handlers.

use axum::{extract::State, Json};
use domain::models::account::UserCodeRequest;
use domain::models::device::{RegisterDeviceRequest, RegisterDeviceResponse};
use domain::models::device_status::DeviceStatusResponse;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ApiJson;

/// Latest status of every device of an account, including never-seen ones.
///
/// POST /device-status
pub async fn device_status(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserCodeRequest>,
) -> Result<Json<DeviceStatusResponse>, ApiError> {
    request.validate()?;

    let devices = state.accounts.device_statuses(&request.user_code).await?;

    Ok(Json(devices.into()))
}

/// Bind a device to an account.
///
/// POST /register-device
pub async fn register_device(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterDeviceRequest>,
) -> Result<Json<RegisterDeviceResponse>, ApiError> {
    request.validate()?;

    let device = state
        .accounts
        .register_device(request.into_new_device())
        .await?;

    Ok(Json(device.into()))
}
