//! Keyed persistence for accepted person records.
//!
//! The pipeline only depends on [`RecordStore`]. Two implementations ship with
//! the crate: [`MemoryStore`] for tests and one-shot runs, and
//! [`JsonFileStore`], which keeps the records in a JSON document on disk.

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::pipeline::record::{CanonicalRecord, PersistedRecord};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

/// Durable keyed store of accepted records.
///
/// Methods take `&self` so one store can be shared by concurrent runs behind
/// an `Arc`; implementations serialize their own writes. Ids are assigned by
/// `save`, increase monotonically and are never handed out twice, even after
/// `delete_by_id` or `delete_all`.
pub trait RecordStore: Send + Sync {
    fn save(&self, record: &CanonicalRecord) -> Result<PersistedRecord, StoreError>;

    /// All records in id order.
    fn find_all(&self) -> Result<Vec<PersistedRecord>, StoreError>;

    fn find_by_id(&self, id: u64) -> Result<Option<PersistedRecord>, StoreError>;

    /// Replaces the name of an existing record. `None` if the id is unknown.
    fn update(&self, id: u64, record: &CanonicalRecord) -> Result<Option<PersistedRecord>, StoreError>;

    fn exists_by_id(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.find_by_id(id)?.is_some())
    }

    fn delete_by_id(&self, id: u64) -> Result<(), StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    fn delete_all(&self) -> Result<(), StoreError>;
}

/// Contents shared by the bundled stores; also the on-disk JSON layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreState {
    pub next_id: u64,
    pub records: BTreeMap<u64, String>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: BTreeMap::new(),
        }
    }
}

impl StoreState {
    pub fn insert(&mut self, record: &CanonicalRecord) -> PersistedRecord {
        let id = self.next_id;
        self.next_id += 1;
        self.records.insert(id, record.name.clone());
        PersistedRecord { id, name: record.name.clone() }
    }

    pub fn get(&self, id: u64) -> Option<PersistedRecord> {
        self.records
            .get(&id)
            .map(|name| PersistedRecord { id, name: name.clone() })
    }

    pub fn replace(&mut self, id: u64, record: &CanonicalRecord) -> Option<PersistedRecord> {
        let slot = self.records.get_mut(&id)?;
        *slot = record.name.clone();
        Some(PersistedRecord { id, name: record.name.clone() })
    }

    pub fn all(&self) -> Vec<PersistedRecord> {
        self.records
            .iter()
            .map(|(id, name)| PersistedRecord { id: *id, name: name.clone() })
            .collect()
    }
}
