mod config;
mod memory;
mod postgres;
mod sqlite;
mod types;

pub use config::case_store_from_env;
pub use types::{CaseRecord, CaseStore, InMemoryCaseStore, PostgresCaseStore, SqliteCaseStore};
