use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::pipeline::index::DuplicateIndex;
use crate::pipeline::record::{CanonicalRecord, PersistedRecord};
use crate::store::{RecordStore, StoreError};

/// A batch that stopped at `index`. Records before it are in the store.
#[derive(Error, Debug)]
#[error("Error saving '{name}' at batch index {index}: {cause}")]
pub struct WriteFailed {
    pub index: usize,
    pub name: String,
    #[source]
    pub cause: StoreError,
    pub committed: Vec<PersistedRecord>,
}

/// Saves accepted records one by one. A failed save aborts the rest of the
/// batch; nothing is retried.
pub struct ChunkWriter {
    store: Arc<dyn RecordStore>,
}

impl ChunkWriter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn commit(
        &self,
        batch: &[CanonicalRecord],
        index: &mut dyn DuplicateIndex,
    ) -> Result<Vec<PersistedRecord>, WriteFailed> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        info!("LOAD: Saving {} persons", batch.len());
        let mut committed = Vec::with_capacity(batch.len());

        for (position, record) in batch.iter().enumerate() {
            match self.store.save(record) {
                Ok(saved) => {
                    info!("Person saved: ID={}, Name='{}'", saved.id, saved.name);
                    index.record_written(&saved.name);
                    committed.push(saved);
                }
                Err(cause) => {
                    error!("Error saving person '{}': {}", record.name, cause);
                    return Err(WriteFailed {
                        index: position,
                        name: record.name.clone(),
                        cause,
                        committed,
                    });
                }
            }
        }

        info!("Chunk of {} records saved", committed.len());
        Ok(committed)
    }
}
