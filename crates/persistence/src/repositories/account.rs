//! Account repository for database operations.

use async_trait::async_trait;
use domain::models::Account;
use domain::repositories::AccountRepository;
use domain::DomainResult;
use sqlx::PgPool;

use super::db_error;
use crate::entities::AccountEntity;
use crate::metrics::QueryTimer;

/// Repository for account lookups. Accounts are never written here.
#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_code(&self, user_code: &str) -> DomainResult<Option<Account>> {
        let timer = QueryTimer::new("find_account_by_code");
        let result = sqlx::query_as::<_, AccountEntity>(
            r#"
            SELECT user_code, name, created_at
            FROM accounts
            WHERE user_code = $1
            "#,
        )
        .bind(user_code)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result.map_err(db_error("find_account_by_code"))?.map(Into::into))
    }

    async fn first_available(&self) -> DomainResult<Option<Account>> {
        let timer = QueryTimer::new("first_available_account");
        let result = sqlx::query_as::<_, AccountEntity>(
            r#"
            SELECT user_code, name, created_at
            FROM accounts
            ORDER BY created_at ASC, user_code ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result.map_err(db_error("first_available_account"))?.map(Into::into))
    }
}
