use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::storage::errors::StorageError;
use crate::storage::types::CacheData;

use super::types::{CacheStore, InMemoryCacheStore};

const CACHE_PREFIX: &str = "cache";

impl InMemoryCacheStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory generic cache store");
        Self {
            entry: Mutex::new(HashMap::new()),
        }
    }

    fn make_key(prefix: &str, key: &str) -> String {
        format!("{CACHE_PREFIX}:{prefix}:{key}")
    }

    fn deadline(ttl: usize) -> Option<Instant> {
        (ttl > 0).then(|| Instant::now() + Duration::from_secs(ttl as u64))
    }

    fn is_live(deadline: &Option<Instant>) -> bool {
        deadline.is_none_or(|d| Instant::now() < d)
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn put_with_ttl(
        &self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        self.entry
            .lock()
            .await
            .insert(key, (value, Self::deadline(ttl)));
        Ok(())
    }

    async fn get(&self, prefix: &str, key: &str) -> Result<Option<CacheData>, StorageError> {
        let key = Self::make_key(prefix, key);
        let mut entries = self.entry.lock().await;

        match entries.get(&key) {
            Some((value, deadline)) if Self::is_live(deadline) => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, prefix: &str, key: &str) -> Result<(), StorageError> {
        let key = Self::make_key(prefix, key);
        self.entry.lock().await.remove(&key);
        Ok(())
    }

    async fn put_if_not_exists(
        &self,
        prefix: &str,
        key: &str,
        value: CacheData,
        ttl: usize,
    ) -> Result<bool, StorageError> {
        let key = Self::make_key(prefix, key);
        let mut entries = self.entry.lock().await;

        if let Some((_, deadline)) = entries.get(&key) {
            if Self::is_live(deadline) {
                return Ok(false);
            }
        }

        entries.insert(key, (value, Self::deadline(ttl)));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: &str) -> CacheData {
        CacheData {
            value: value.to_string(),
        }
    }

    #[test]
    fn test_make_key() {
        assert_eq!(
            InMemoryCacheStore::make_key("session", "user123"),
            "cache:session:user123"
        );
    }

    #[tokio::test]
    async fn test_put_and_get() {
        // Given an in-memory cache store
        let store = InMemoryCacheStore::new();

        // When putting a value
        store
            .put_with_ttl("test", "key1", data("test value"), 60)
            .await
            .unwrap();

        // Then it can be read back
        let retrieved = store.get("test", "key1").await.unwrap();
        assert_eq!(retrieved, Some(data("test value")));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryCacheStore::new();
        store.put_with_ttl("test", "key3", data("x"), 0).await.unwrap();

        store.remove("test", "key3").await.unwrap();

        assert!(store.get("test", "key3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prefixes_are_isolated() {
        let store = InMemoryCacheStore::new();
        store.put_with_ttl("p1", "k", data("one"), 0).await.unwrap();
        store.put_with_ttl("p2", "k", data("two"), 0).await.unwrap();

        assert_eq!(store.get("p1", "k").await.unwrap(), Some(data("one")));
        assert_eq!(store.get("p2", "k").await.unwrap(), Some(data("two")));
    }

    #[tokio::test]
    async fn test_put_if_not_exists_only_once() {
        // Given an empty store
        let store = InMemoryCacheStore::new();

        // When the same key is claimed twice
        let first = store
            .put_if_not_exists("consumed", "state-1", data("1"), 600)
            .await
            .unwrap();
        let second = store
            .put_if_not_exists("consumed", "state-1", data("2"), 600)
            .await
            .unwrap();

        // Then only the first claim succeeds and the value is untouched
        assert!(first);
        assert!(!second);
        assert_eq!(
            store.get("consumed", "state-1").await.unwrap(),
            Some(data("1"))
        );
    }

    #[tokio::test]
    async fn test_expired_entry_is_gone_and_reclaimable() {
        let store = InMemoryCacheStore::new();
        store
            .put_if_not_exists("consumed", "s", data("1"), 1)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(store.get("consumed", "s").await.unwrap().is_none());
        assert!(
            store
                .put_if_not_exists("consumed", "s", data("2"), 1)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let store = std::sync::Arc::new(InMemoryCacheStore::new());

        let mut handles = vec![];
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .put_if_not_exists("consumed", "race", data(&i.to_string()), 600)
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
