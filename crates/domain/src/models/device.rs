//! Device domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A smoke detector bound to exactly one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub user_code: String,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ownership binding to create for a device.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub device_id: String,
    pub user_code: String,
    pub name: String,
    pub location: Option<String>,
}

impl NewDevice {
    /// Binding created when the webhook path adopts an unknown device.
    ///
    /// The vendor identifier doubles as the display name until the user renames it.
    pub fn adopted(device_id: &str, user_code: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            user_code: user_code.to_string(),
            name: device_id.to_string(),
            location: None,
        }
    }
}

/// Request payload for explicit device registration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterDeviceRequest {
    #[validate(custom(function = "shared::validation::validate_user_code"))]
    pub user_code: String,

    #[serde(rename = "deviceId")]
    #[validate(custom(function = "shared::validation::validate_device_id"))]
    pub device_id: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,
}

impl RegisterDeviceRequest {
    /// Convert into a binding, defaulting the display name to the device id.
    pub fn into_new_device(self) -> NewDevice {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.device_id.clone());
        NewDevice {
            device_id: self.device_id,
            user_code: self.user_code,
            name,
            location: self.location.filter(|l| !l.trim().is_empty()),
        }
    }
}

/// Response payload for device registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceResponse {
    pub success: bool,
    pub device_id: String,
    pub user_code: String,
}

impl From<Device> for RegisterDeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            success: true,
            device_id: device.device_id,
            user_code: device.user_code,
        }
    }
}
