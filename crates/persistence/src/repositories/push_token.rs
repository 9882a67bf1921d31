//! Push token repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::PushToken;
use domain::repositories::PushTokenRepository;
use domain::DomainResult;
use sqlx::PgPool;

use super::db_error;
use crate::entities::PushTokenEntity;
use crate::metrics::QueryTimer;

/// Repository for client push tokens.
#[derive(Clone)]
pub struct PostgresPushTokenRepository {
    pool: PgPool,
}

impl PostgresPushTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PushTokenRepository for PostgresPushTokenRepository {
    async fn upsert(
        &self,
        token: &str,
        user_code: &str,
        platform: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<PushToken> {
        let timer = QueryTimer::new("upsert_push_token");
        let result = sqlx::query_as::<_, PushTokenEntity>(
            r#"
            INSERT INTO push_tokens (token, user_code, platform, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (token) DO UPDATE SET
                user_code = EXCLUDED.user_code,
                platform = EXCLUDED.platform,
                updated_at = EXCLUDED.updated_at
            RETURNING token, user_code, platform, created_at, updated_at
            "#,
        )
        .bind(token)
        .bind(user_code)
        .bind(platform)
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result.map_err(db_error("upsert_push_token"))?.into())
    }

    async fn list_for_account(&self, user_code: &str) -> DomainResult<Vec<PushToken>> {
        let timer = QueryTimer::new("list_push_tokens_for_account");
        let result = sqlx::query_as::<_, PushTokenEntity>(
            r#"
            SELECT token, user_code, platform, created_at, updated_at
            FROM push_tokens
            WHERE user_code = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_code)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        let entities = result.map_err(db_error("list_push_tokens_for_account"))?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, token: &str) -> DomainResult<bool> {
        let timer = QueryTimer::new("delete_push_token");
        let result = sqlx::query("DELETE FROM push_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await;
        timer.finish(&result);

        Ok(result.map_err(db_error("delete_push_token"))?.rows_affected() > 0)
    }
}
