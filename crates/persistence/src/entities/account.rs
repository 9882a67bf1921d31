//! Account entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the accounts table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountEntity {
    pub user_code: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountEntity> for domain::models::Account {
    fn from(entity: AccountEntity) -> Self {
        Self {
            user_code: entity.user_code,
            name: entity.name,
            created_at: entity.created_at,
        }
    }
}
