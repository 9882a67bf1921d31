//! Push token entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the push_tokens table.
#[derive(Debug, Clone, FromRow)]
pub struct PushTokenEntity {
    pub token: String,
    pub user_code: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PushTokenEntity> for domain::models::PushToken {
    fn from(entity: PushTokenEntity) -> Self {
        Self {
            token: entity.token,
            user_code: entity.user_code,
            platform: entity.platform,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
