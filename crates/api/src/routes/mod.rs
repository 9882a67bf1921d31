//! HTTP route handlers.

pub mod accounts;
pub mod alarms;
pub mod devices;
pub mod health;
pub mod webhook;
