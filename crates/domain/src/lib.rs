//! Domain layer for the Smokewatch backend.
//!
//! This crate contains:
//! - Domain models (Account, Device, DeviceStatus, AlarmEvent, PushToken)
//! - Repository ports implemented by the persistence crate
//! - The ingestion pipeline services (normalizer, resolver, alarm detector, fan-out)
//! - Domain error types

pub mod error;
pub mod models;
pub mod repositories;
pub mod services;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DomainError, DomainResult};
