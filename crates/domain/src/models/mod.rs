//! Domain models for Smokewatch.

pub mod account;
pub mod alarm_event;
pub mod device;
pub mod device_status;
pub mod push_token;

pub use account::{Account, VerifyCodeResponse};
pub use alarm_event::{AlarmEvent, AlarmHistoryEntry, AlarmType, NewAlarmEvent};
pub use device::{Device, NewDevice};
pub use device_status::{DeviceStatus, DeviceStatusUpdate, DeviceStatusView};
pub use push_token::PushToken;
