use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::auth::token::TokenValidity;
use crate::db::models::TokenRecord;
use crate::db::store::{StoreError, TokenStore};

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct TokenRepository {
    pool: Pool<Postgres>,
}

impl TokenRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn insert(
        &self,
        comment: &str,
        validity: TokenValidity,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<TokenRecord, StoreError> {
        let record = sqlx::query_as::<_, TokenRecord>(
            r#"
            INSERT INTO token (comment, duration_secs, token, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, comment, duration_secs, token, created_at
            "#,
        )
        .bind(comment)
        .bind(validity.duration().num_seconds())
        .bind(token)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!("Token stored with id={}", record.id);
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<TokenRecord>, StoreError> {
        let records = sqlx::query_as::<_, TokenRecord>(
            "SELECT id, comment, duration_secs, token, created_at FROM token ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM token WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        debug!("Token delete id={}: {} rows", id, result.rows_affected());
        Ok(result.rows_affected() > 0)
    }

    async fn contains(&self, token: &str) -> Result<bool, StoreError> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM token WHERE token = $1)")
            .bind(token)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }
}
