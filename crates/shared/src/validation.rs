//! Common validation utilities.

use validator::ValidationError;

/// Minimum length of an account user code.
pub const MIN_USER_CODE_LENGTH: usize = 4;

/// Maximum length of an account user code.
pub const MAX_USER_CODE_LENGTH: usize = 32;

/// Maximum length of a vendor device identifier.
pub const MAX_DEVICE_ID_LENGTH: usize = 128;

/// Maximum length of a push token.
pub const MAX_PUSH_TOKEN_LENGTH: usize = 4096;

/// Validates an account user code: short, alphanumeric, hyphens and underscores allowed.
pub fn validate_user_code(code: &str) -> Result<(), ValidationError> {
    let len = code.chars().count();
    if !(MIN_USER_CODE_LENGTH..=MAX_USER_CODE_LENGTH).contains(&len) {
        let mut err = ValidationError::new("user_code_length");
        err.message = Some(
            format!(
                "User code must be between {} and {} characters",
                MIN_USER_CODE_LENGTH, MAX_USER_CODE_LENGTH
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("user_code_charset");
        err.message = Some(
            "User code may only contain letters, digits, hyphens, and underscores".into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates a vendor device identifier (e.g. `shellyplussmoke-a8032ab12345`).
pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    if device_id.trim().is_empty() {
        let mut err = ValidationError::new("device_id_required");
        err.message = Some("Device ID is required".into());
        return Err(err);
    }

    if device_id.len() > MAX_DEVICE_ID_LENGTH {
        let mut err = ValidationError::new("device_id_length");
        err.message = Some(
            format!(
                "Device ID must be at most {} characters",
                MAX_DEVICE_ID_LENGTH
            )
            .into(),
        );
        return Err(err);
    }

    if device_id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("device_id_whitespace");
        err.message = Some("Device ID must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a client push token.
pub fn validate_push_token(token: &str) -> Result<(), ValidationError> {
    if token.trim().is_empty() || token.len() > MAX_PUSH_TOKEN_LENGTH {
        let mut err = ValidationError::new("push_token_invalid");
        err.message = Some("Push token must be a non-empty string".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_code() {
        assert!(validate_user_code("DEMO01").is_ok());
        assert!(validate_user_code("home_2-a").is_ok());
    }

    #[test]
    fn test_validate_user_code_length() {
        assert!(validate_user_code("abc").is_err());
        assert!(validate_user_code(&"A".repeat(33)).is_err());
        assert!(validate_user_code(&"A".repeat(32)).is_ok());
    }

    #[test]
    fn test_validate_user_code_charset() {
        let err = validate_user_code("DEMO 01").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "User code may only contain letters, digits, hyphens, and underscores"
        );
        assert!(validate_user_code("DEMO/01").is_err());
    }

    #[test]
    fn test_validate_device_id() {
        assert!(validate_device_id("shellyplussmoke-a8032ab12345").is_ok());
        assert!(validate_device_id("dev-1").is_ok());
    }

    #[test]
    fn test_validate_device_id_empty() {
        let err = validate_device_id("  ").unwrap_err();
        assert_eq!(err.message.unwrap().to_string(), "Device ID is required");
    }

    #[test]
    fn test_validate_device_id_too_long() {
        assert!(validate_device_id(&"d".repeat(129)).is_err());
        assert!(validate_device_id(&"d".repeat(128)).is_ok());
    }

    #[test]
    fn test_validate_device_id_whitespace() {
        assert!(validate_device_id("dev 1").is_err());
    }

    #[test]
    fn test_validate_push_token() {
        assert!(validate_push_token("fcm-token").is_ok());
        assert!(validate_push_token("").is_err());
        assert!(validate_push_token(&"t".repeat(4097)).is_err());
    }
}
