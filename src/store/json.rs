use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::pipeline::record::{CanonicalRecord, PersistedRecord};
use crate::store::{RecordStore, StoreError, StoreState};

/// Store backed by a single JSON document.
///
/// Every mutation writes the whole document to a sibling temp file and renames
/// it over the original, so a save either lands completely or not at all. The
/// in-memory copy only changes once the file is on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            StoreState::default()
        };

        debug!("Opened store {} with {} records", path.display(), state.records.len());
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut StoreState) -> T) -> Result<T, StoreError> {
        let mut guard = self.state.lock();
        let mut next = guard.clone();
        let result = apply(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(result)
    }
}

impl RecordStore for JsonFileStore {
    fn save(&self, record: &CanonicalRecord) -> Result<PersistedRecord, StoreError> {
        self.mutate(|state| state.insert(record))
    }

    fn find_all(&self) -> Result<Vec<PersistedRecord>, StoreError> {
        Ok(self.state.lock().all())
    }

    fn find_by_id(&self, id: u64) -> Result<Option<PersistedRecord>, StoreError> {
        Ok(self.state.lock().get(id))
    }

    fn update(&self, id: u64, record: &CanonicalRecord) -> Result<Option<PersistedRecord>, StoreError> {
        if !self.state.lock().records.contains_key(&id) {
            return Ok(None);
        }
        self.mutate(|state| state.replace(id, record))
    }

    fn delete_by_id(&self, id: u64) -> Result<(), StoreError> {
        if !self.state.lock().records.contains_key(&id) {
            return Ok(());
        }
        self.mutate(|state| {
            state.records.remove(&id);
        })
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock().records.len())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.mutate(|state| state.records.clear())
    }
}
