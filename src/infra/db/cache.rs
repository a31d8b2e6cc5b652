use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    application::repos::{CacheRepo, RepoError},
    domain::cache::{CacheKey, CacheRecord, CacheValue, RecordState},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CacheRow {
    id: i32,
    key: String,
    value: String,
    is_deleted: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CacheRow> for CacheRecord {
    fn from(row: CacheRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            value: row.value,
            state: RecordState::from_deleted_flag(row.is_deleted),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CacheRepo for PostgresRepositories {
    async fn upsert(&self, key: &CacheKey, value: &CacheValue) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO cache (key, value, is_deleted, created_at, updated_at)
            VALUES ($1, $2, FALSE, now(), now())
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                is_deleted = FALSE,
                updated_at = now()
            "#,
        )
        .bind(key.as_str())
        .bind(value.as_str())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_active(&self, key: &CacheKey) -> Result<Option<CacheRecord>, RepoError> {
        let row = sqlx::query_as::<_, CacheRow>(
            r#"
            SELECT id, key, value, is_deleted, created_at, updated_at
            FROM cache
            WHERE key = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CacheRecord::from))
    }

    async fn soft_delete(&self, key: &CacheKey) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE cache
            SET is_deleted = TRUE,
                updated_at = now()
            WHERE key = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(key.as_str())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        debug!(
            target: "kvcache::infra::db::cache",
            key = %key,
            rows = result.rows_affected(),
            "soft delete applied"
        );
        Ok(())
    }

    async fn check_connection(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
