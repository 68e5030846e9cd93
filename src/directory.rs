//! Single-record management of stored persons.
//!
//! Names go through the same [`normalize`] as the import pipeline, so a person
//! added by hand and one imported from a file end up with the same spelling
//! and collide the same way.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::pipeline::record::{fold_key, normalize, CanonicalRecord, PersistedRecord};
use crate::store::{RecordStore, StoreError};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Person '{name}' already exists with ID {id}")]
    Duplicate { name: String, id: u64 },

    #[error("Person not found with ID: {id}")]
    NotFound { id: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct PersonDirectory {
    store: Arc<dyn RecordStore>,
}

impl PersonDirectory {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, name: &str) -> Result<PersistedRecord, DirectoryError> {
        let name = canonical_name(name)?;
        if let Some(existing) = self.find_by_name(&name, None)? {
            return Err(DirectoryError::Duplicate { name, id: existing.id });
        }

        let saved = self.store.save(&CanonicalRecord::new(name))?;
        info!("Person created: ID={}, Name='{}'", saved.id, saved.name);
        Ok(saved)
    }

    pub fn list(&self) -> Result<Vec<PersistedRecord>, DirectoryError> {
        Ok(self.store.find_all()?)
    }

    pub fn get(&self, id: u64) -> Result<PersistedRecord, DirectoryError> {
        self.store
            .find_by_id(id)?
            .ok_or(DirectoryError::NotFound { id })
    }

    /// Renames a person. Renaming to a different spelling of its own name is
    /// allowed; taking another person's name is not.
    pub fn rename(&self, id: u64, name: &str) -> Result<PersistedRecord, DirectoryError> {
        let name = canonical_name(name)?;
        if let Some(existing) = self.find_by_name(&name, Some(id))? {
            return Err(DirectoryError::Duplicate { name, id: existing.id });
        }

        let updated = self
            .store
            .update(id, &CanonicalRecord::new(name))?
            .ok_or(DirectoryError::NotFound { id })?;
        info!("Person updated: ID={}, Name='{}'", updated.id, updated.name);
        Ok(updated)
    }

    pub fn delete(&self, id: u64) -> Result<(), DirectoryError> {
        if !self.store.exists_by_id(id)? {
            warn!("Delete requested for unknown person ID {}", id);
            return Err(DirectoryError::NotFound { id });
        }

        self.store.delete_by_id(id)?;
        info!("Person deleted: ID={}", id);
        Ok(())
    }

    /// Removes every person and returns how many there were.
    pub fn delete_all(&self) -> Result<usize, DirectoryError> {
        let count = self.store.count()?;
        self.store.delete_all()?;
        info!("Deleted all {} persons", count);
        Ok(count)
    }

    fn find_by_name(
        &self,
        name: &str,
        except: Option<u64>,
    ) -> Result<Option<PersistedRecord>, DirectoryError> {
        let key = fold_key(name);
        Ok(self
            .store
            .find_all()?
            .into_iter()
            .find(|r| Some(r.id) != except && fold_key(&r.name) == key))
    }
}

fn canonical_name(raw: &str) -> Result<String, DirectoryError> {
    let name = normalize(raw);
    if name.is_empty() {
        return Err(DirectoryError::EmptyName);
    }
    Ok(name)
}
