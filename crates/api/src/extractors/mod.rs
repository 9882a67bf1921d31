//! Custom Axum extractors.
//!
//! Extractors for parsing request data.

pub mod json;

pub use json::{parse_payload, ApiJson};
