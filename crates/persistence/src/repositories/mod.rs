//! Postgres implementations of the domain repository ports.

pub mod account;
pub mod alarm_event;
pub mod device;
pub mod device_status;
pub mod push_token;

use std::sync::Arc;

use domain::repositories::Repositories;
use domain::DomainError;
use sqlx::PgPool;

pub use account::PostgresAccountRepository;
pub use alarm_event::PostgresAlarmEventRepository;
pub use device::PostgresDeviceRepository;
pub use device_status::PostgresDeviceStatusRepository;
pub use push_token::PostgresPushTokenRepository;

/// All repositories over one connection pool.
pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        accounts: Arc::new(PostgresAccountRepository::new(pool.clone())),
        devices: Arc::new(PostgresDeviceRepository::new(pool.clone())),
        statuses: Arc::new(PostgresDeviceStatusRepository::new(pool.clone())),
        alarms: Arc::new(PostgresAlarmEventRepository::new(pool.clone())),
        push_tokens: Arc::new(PostgresPushTokenRepository::new(pool)),
    }
}

/// Map a sqlx error to a domain persistence error, logging the failing query.
pub(crate) fn db_error(query: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| {
        tracing::error!(query = query, error = %e, "Database query failed");
        DomainError::Persistence(e.to_string())
    }
}
