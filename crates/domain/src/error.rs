//! Domain error types.

use thiserror::Error;

/// Message returned when an inbound event carries no usable device identifier.
pub const DEVICE_ID_REQUIRED: &str = "Device ID is required";

/// Message returned when unknown devices are rejected instead of adopted.
pub const DEVICE_NOT_REGISTERED: &str = "Device not registered";

/// Message returned when an unknown device cannot be adopted because no account exists.
pub const NO_ACCOUNTS_AVAILABLE: &str = "Device not registered and no users available";

/// Errors raised by domain services and repository ports.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The inbound payload is unusable (e.g. no device identifier at all).
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Deployment-level problem: no accounts to adopt into, missing push credentials.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether this error indicates an operational problem rather than a bad request.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_display() {
        assert_eq!(
            DomainError::MalformedPayload(DEVICE_ID_REQUIRED.to_string()).to_string(),
            "Malformed payload: Device ID is required"
        );
        assert_eq!(
            DomainError::Configuration(NO_ACCOUNTS_AVAILABLE.to_string()).to_string(),
            "Configuration error: Device not registered and no users available"
        );
    }

    #[test]
    fn test_is_operational() {
        assert!(DomainError::Configuration("x".into()).is_operational());
        assert!(DomainError::Persistence("x".into()).is_operational());
        assert!(!DomainError::NotFound("x".into()).is_operational());
        assert!(!DomainError::Validation("x".into()).is_operational());
    }
}
