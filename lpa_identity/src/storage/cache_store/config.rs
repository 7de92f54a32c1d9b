use std::sync::Arc;

use crate::session::env_or;
use crate::storage::errors::StorageError;

use super::types::{CacheStore, InMemoryCacheStore, RedisCacheStore};

/// Builds the cache store named by `GENERIC_CACHE_STORE_TYPE` (`memory` or `redis`).
pub async fn cache_store_from_env() -> Result<Arc<dyn CacheStore>, StorageError> {
    let store_type = env_or("GENERIC_CACHE_STORE_TYPE", "memory");
    let store_url = env_or("GENERIC_CACHE_STORE_URL", "redis://localhost:6379");

    tracing::info!("Initializing cache store with type: {}", store_type);

    let store: Arc<dyn CacheStore> = match store_type.as_str() {
        "memory" => Arc::new(InMemoryCacheStore::new()),
        "redis" => Arc::new(RedisCacheStore::new(&store_url)?),
        t => {
            return Err(StorageError::Storage(format!(
                "Unsupported cache store type: {t}. Supported types are 'memory' and 'redis'"
            )));
        }
    };

    store.init().await?;
    tracing::info!("Connected to cache store: type={}", store_type);

    Ok(store)
}
