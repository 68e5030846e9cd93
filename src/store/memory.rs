use parking_lot::Mutex;

use crate::pipeline::record::{CanonicalRecord, PersistedRecord};
use crate::store::{RecordStore, StoreError, StoreState};

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = StoreState::default();
        for name in names {
            state.insert(&CanonicalRecord::new(name));
        }
        Self { state: Mutex::new(state) }
    }
}

impl RecordStore for MemoryStore {
    fn save(&self, record: &CanonicalRecord) -> Result<PersistedRecord, StoreError> {
        Ok(self.state.lock().insert(record))
    }

    fn find_all(&self) -> Result<Vec<PersistedRecord>, StoreError> {
        Ok(self.state.lock().all())
    }

    fn find_by_id(&self, id: u64) -> Result<Option<PersistedRecord>, StoreError> {
        Ok(self.state.lock().get(id))
    }

    fn update(&self, id: u64, record: &CanonicalRecord) -> Result<Option<PersistedRecord>, StoreError> {
        Ok(self.state.lock().replace(id, record))
    }

    fn delete_by_id(&self, id: u64) -> Result<(), StoreError> {
        self.state.lock().records.remove(&id);
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock().records.len())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.state.lock().records.clear();
        Ok(())
    }
}
