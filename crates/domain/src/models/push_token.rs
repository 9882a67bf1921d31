//! Push token domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Platform reported when the client does not send one.
pub const DEFAULT_PLATFORM: &str = "android";

/// A registered client push token. The token value is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PushToken {
    pub token: String,
    pub user_code: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for push token registration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterPushTokenRequest {
    #[validate(custom(function = "shared::validation::validate_user_code"))]
    pub user_code: String,

    #[validate(custom(function = "shared::validation::validate_push_token"))]
    pub token: String,

    #[serde(default = "default_platform")]
    #[validate(length(min = 1, max = 20, message = "Platform must be between 1 and 20 characters"))]
    pub platform: String,
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_push_token_default_platform() {
        let request: RegisterPushTokenRequest =
            serde_json::from_str(r#"{"user_code":"DEMO01","token":"abc"}"#).unwrap();
        assert_eq!(request.platform, "android");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_register_push_token_empty_token_rejected() {
        let request: RegisterPushTokenRequest =
            serde_json::from_str(r#"{"user_code":"DEMO01","token":"","platform":"ios"}"#).unwrap();
        assert!(request.validate().is_err());
    }
}
