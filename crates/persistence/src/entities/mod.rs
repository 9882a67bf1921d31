//! Database entity definitions (row mappings).

pub mod account;
pub mod alarm_event;
pub mod device;
pub mod device_status;
pub mod push_token;

pub use account::AccountEntity;
pub use alarm_event::{AlarmEventEntity, AlarmHistoryEntity};
pub use device::DeviceEntity;
pub use device_status::DeviceStatusViewEntity;
pub use push_token::PushTokenEntity;
