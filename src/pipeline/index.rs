use std::collections::HashSet;
use std::sync::Arc;

use crate::pipeline::config::DedupStrategy;
use crate::pipeline::record::fold_key;
use crate::store::{RecordStore, StoreError};

/// Answers "is this name already stored?" for one run.
///
/// Matching is exact on the whole normalized name and ignores case. Every
/// record the run saves is reported through [`DuplicateIndex::record_written`]
/// before the next candidate is checked, so later chunks see earlier ones.
pub trait DuplicateIndex: Send + Sync {
    fn is_duplicate(&self, name: &str) -> Result<bool, StoreError>;

    fn record_written(&mut self, name: &str);
}

/// Reads the whole store for every candidate.
pub struct StoreScanIndex {
    store: Arc<dyn RecordStore>,
}

impl StoreScanIndex {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

impl DuplicateIndex for StoreScanIndex {
    fn is_duplicate(&self, name: &str) -> Result<bool, StoreError> {
        let key = fold_key(name);
        Ok(self
            .store
            .find_all()?
            .iter()
            .any(|existing| fold_key(&existing.name) == key))
    }

    // the store already holds it
    fn record_written(&mut self, _name: &str) {}
}

/// Case-folded names loaded from the store when the run starts.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    keys: HashSet<String>,
}

impl MemoryIndex {
    pub fn load(store: &dyn RecordStore) -> Result<Self, StoreError> {
        let keys = store
            .find_all()?
            .iter()
            .map(|record| fold_key(&record.name))
            .collect();
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl DuplicateIndex for MemoryIndex {
    fn is_duplicate(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.keys.contains(&fold_key(name)))
    }

    fn record_written(&mut self, name: &str) {
        self.keys.insert(fold_key(name));
    }
}

/// View of the run's index while a chunk is being processed. Names accepted
/// earlier in the same chunk are not in the store yet, so they are staged here
/// and count as duplicates for the rest of the chunk.
pub struct ChunkScope<'a> {
    base: &'a dyn DuplicateIndex,
    staged: HashSet<String>,
}

impl<'a> ChunkScope<'a> {
    pub fn new(base: &'a dyn DuplicateIndex) -> Self {
        Self {
            base,
            staged: HashSet::new(),
        }
    }

    pub fn stage(&mut self, name: &str) {
        self.staged.insert(fold_key(name));
    }
}

impl DuplicateIndex for ChunkScope<'_> {
    fn is_duplicate(&self, name: &str) -> Result<bool, StoreError> {
        if self.staged.contains(&fold_key(name)) {
            return Ok(true);
        }
        self.base.is_duplicate(name)
    }

    fn record_written(&mut self, name: &str) {
        self.stage(name);
    }
}

pub fn build_index(
    strategy: DedupStrategy,
    store: &Arc<dyn RecordStore>,
) -> Result<Box<dyn DuplicateIndex>, StoreError> {
    Ok(match strategy {
        DedupStrategy::Memory => Box::new(MemoryIndex::load(store.as_ref())?),
        DedupStrategy::Scan => Box::new(StoreScanIndex::new(Arc::clone(store))),
    })
}
