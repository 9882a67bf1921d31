//! Account domain model.
//!
//! Accounts are created out of band and identified by a short user code that
//! the mobile app uses as its login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Tenant boundary: owns devices and push tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub user_code: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body carrying only a user code.
///
/// Used by the login check and the dashboard status query.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserCodeRequest {
    #[validate(custom(function = "shared::validation::validate_user_code"))]
    pub user_code: String,
}

/// Response for a user code verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub valid: bool,
    pub user_code: String,
    pub device_count: i64,
}
