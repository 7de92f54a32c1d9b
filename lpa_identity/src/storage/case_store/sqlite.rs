use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::storage::errors::StorageError;

use super::types::{CaseRecord, CaseStore, SqliteCaseStore};

impl SqliteCaseStore {
    pub fn new(pool: sqlx::SqlitePool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait]
impl CaseStore for SqliteCaseStore {
    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY NOT NULL,
                data TEXT NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<CaseRecord, StorageError> {
        let row = sqlx::query(&format!("SELECT data FROM {} WHERE id = ?", self.table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let data: String = row.try_get("data")?;
        Ok(serde_json::from_str(&data)?)
    }

    async fn put(&self, record: &CaseRecord) -> Result<(), StorageError> {
        let data = serde_json::to_string(record)?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, data, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
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
