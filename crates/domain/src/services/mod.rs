//! Domain services for Smokewatch.
//!
//! The ingestion pipeline and the account-facing operations. Services only
//! see repository ports and the notification sink.

pub mod account;
pub mod alarm;
pub mod fanout;
pub mod ingestion;
pub mod normalizer;
pub mod notification;
pub mod resolver;

pub use account::AccountService;
pub use alarm::{AlarmDecision, AlarmDetector};
pub use fanout::{DeliveryFailure, FanoutConfig, FanoutResult, NotificationFanout};
pub use ingestion::{AlarmStage, IngestOutcome, IngestionConfig, IngestionService, TestAlarmOutcome};
pub use normalizer::StatusNormalizer;
pub use notification::{
    DeliveryOutcome, LoggingNotificationSink, NotificationError, NotificationSink,
    NotificationType, PushMessage, UnconfiguredNotificationSink,
};
pub use resolver::{DeviceIdentityResolver, Resolution, UnknownDevicePolicy};
