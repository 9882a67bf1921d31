//! Persistence layer for the Smokewatch backend.
//!
//! This crate contains:
//! - Database connection management and embedded migrations
//! - Entity definitions (database row mappings)
//! - Postgres implementations of the domain repository ports
//! - Query timing metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

pub use repositories::postgres_repositories;
