//! Shared utilities and common types for the Smokewatch backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Push token fingerprinting for log-safe identifiers
//! - List limit clamping for history queries
//! - Common validation logic (user codes, device identifiers)

pub mod crypto;
pub mod pagination;
pub mod validation;
