use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;

use super::types::{CaseRecord, CaseStore, InMemoryCaseStore};

impl InMemoryCaseStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory case store");
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<CaseRecord, StorageError> {
        self.records
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn put(&self, record: &CaseRecord) -> Result<(), StorageError> {
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}
