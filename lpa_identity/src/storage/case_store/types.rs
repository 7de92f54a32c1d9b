use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::context::Role;
use crate::onelogin::IdentityClaimResult;
use crate::storage::errors::StorageError;

/// A case as seen by the login core.
///
/// Only `identity` is ever changed here. Every other field the record
/// store keeps is carried through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    #[serde(default)]
    pub identity: BTreeMap<Role, IdentityClaimResult>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CaseRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn identity_for(&self, role: Role) -> Option<&IdentityClaimResult> {
        self.identity.get(&role)
    }

    /// True when the role already has a confirmed identity on this case.
    pub fn is_confirmed(&self, role: Role) -> bool {
        self.identity_for(role).is_some_and(|r| r.confirmed)
    }

    pub fn set_identity(&mut self, role: Role, result: IdentityClaimResult) {
        self.identity.insert(role, result);
    }
}

pub struct InMemoryCaseStore {
    pub(super) records: Mutex<HashMap<String, CaseRecord>>,
}

pub struct SqliteCaseStore {
    pub(super) pool: sqlx::SqlitePool,
    pub(super) table: String,
}

pub struct PostgresCaseStore {
    pub(super) pool: sqlx::PgPool,
    pub(super) table: String,
}

/// Access to the external case records.
#[async_trait]
pub trait CaseStore: Send + Sync + 'static {
    /// Create tables or other backing structures if needed.
    async fn init(&self) -> Result<(), StorageError>;

    /// Load a case. `StorageError::NotFound` if there is no such case.
    async fn get(&self, id: &str) -> Result<CaseRecord, StorageError>;

    /// Write the whole record back. Last writer wins.
    async fn put(&self, record: &CaseRecord) -> Result<(), StorageError>;
}
