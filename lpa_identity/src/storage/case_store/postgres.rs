use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::storage::errors::StorageError;

use super::types::{CaseRecord, CaseStore, PostgresCaseStore};

impl PostgresCaseStore {
    pub fn new(pool: sqlx::PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait]
impl CaseStore for PostgresCaseStore {
    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY NOT NULL,
                data JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<CaseRecord, StorageError> {
        let row = sqlx::query(&format!("SELECT data FROM {} WHERE id = $1", self.table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let data: serde_json::Value = row.try_get("data")?;
        Ok(serde_json::from_value(data)?)
    }

    async fn put(&self, record: &CaseRecord) -> Result<(), StorageError> {
        let data = serde_json::to_value(record)?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, data, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
            "#,
            self.table
        ))
        .bind(&record.id)
        .bind(data)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
