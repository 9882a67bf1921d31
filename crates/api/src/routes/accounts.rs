//! Account endpoint handlers: login code check and push token registration.

use axum::{extract::State, Json};
use chrono::Utc;
use domain::models::account::UserCodeRequest;
use domain::models::push_token::RegisterPushTokenRequest;
use domain::models::VerifyCodeResponse;
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ApiJson;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Whether a user code belongs to an account. Unknown codes are not errors.
///
/// POST /verify-code
pub async fn verify_code(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, ApiError> {
    request.validate()?;

    let response = state.accounts.verify_code(&request.user_code).await?;

    Ok(Json(response))
}

/// Register or move a push token. The last registration wins.
///
/// POST /register-push-token
pub async fn register_push_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterPushTokenRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    request.validate()?;

    state
        .accounts
        .register_push_token(
            &request.user_code,
            &request.token,
            &request.platform,
            Utc::now(),
        )
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}
