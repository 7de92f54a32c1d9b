mod cache_store;
mod case_store;
mod errors;
mod types;

pub use cache_store::{CacheStore, InMemoryCacheStore, RedisCacheStore, cache_store_from_env};
pub use case_store::{
    CaseRecord, CaseStore, InMemoryCaseStore, PostgresCaseStore, SqliteCaseStore,
    case_store_from_env,
};
pub use errors::StorageError;
pub use types::CacheData;
