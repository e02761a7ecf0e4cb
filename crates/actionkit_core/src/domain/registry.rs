//! Ordered, hash-keyed set of registered extension records.
//!
//! # Invariants
//! - Object ids are unique across all registered records.
//! - Category paths are unique per object across all registered records.
//! - A rejected registration leaves the registry untouched, generation
//!   included.
//! - Registration order is kept and is the tie-break for composition.

use crate::logging::log_value;
use crate::model::{ExtensionRecord, ObjectInfo};
use indexmap::IndexMap;
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicated extension hash `{0}`")]
    DuplicateHash(String),
    #[error("duplicated object id `{0}`")]
    DuplicateObjectId(String),
    #[error("duplicated object categories `{}`", .0.join(";"))]
    DuplicateCategories(Vec<String>),
}

#[derive(Debug, Default, Clone)]
pub struct ExtensionRegistry {
    extensions: IndexMap<String, Arc<ExtensionRecord>>,
    objects: IndexMap<String, ObjectInfo>,
    categories: HashSet<Vec<String>>,
    generation: u64,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `record` after checking hash, ids, and category paths.
    pub fn add(&mut self, record: Arc<ExtensionRecord>) -> Result<(), RegistryError> {
        if let Err(err) = self.check(&record) {
            warn!(
                "event=extension_add module=registry status=error hash={} reason={}",
                record.hash(),
                log_value(&err.to_string())
            );
            return Err(err);
        }

        for object in record.objects() {
            self.categories.insert(object.categories.clone());
            self.objects.insert(object.id.clone(), object.clone());
        }
        info!(
            "event=extension_add module=registry status=ok hash={} objects={}",
            record.hash(),
            record.objects().len()
        );
        self.extensions.insert(record.hash().to_string(), record);
        self.generation += 1;
        Ok(())
    }

    fn check(&self, record: &ExtensionRecord) -> Result<(), RegistryError> {
        if self.extensions.contains_key(record.hash()) {
            return Err(RegistryError::DuplicateHash(record.hash().to_string()));
        }
        let mut ids = HashSet::new();
        let mut categories = HashSet::new();
        for object in record.objects() {
            if self.objects.contains_key(&object.id) || !ids.insert(object.id.as_str()) {
                return Err(RegistryError::DuplicateObjectId(object.id.clone()));
            }
            if self.categories.contains(&object.categories)
                || !categories.insert(object.categories.as_slice())
            {
                return Err(RegistryError::DuplicateCategories(object.categories.clone()));
            }
        }
        Ok(())
    }

    /// Unregisters the record with `hash` together with its objects.
    pub fn remove(&mut self, hash: &str) -> Option<Arc<ExtensionRecord>> {
        let record = self.extensions.shift_remove(hash)?;
        for object in record.objects() {
            self.objects.shift_remove(&object.id);
            self.categories.remove(&object.categories);
        }
        self.generation += 1;
        info!(
            "event=extension_remove module=registry status=ok hash={}",
            record.hash()
        );
        Some(record)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.extensions.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<&Arc<ExtensionRecord>> {
        self.extensions.get(hash)
    }

    /// Records in registration order.
    pub fn extensions(&self) -> impl Iterator<Item = &Arc<ExtensionRecord>> + '_ {
        self.extensions.values()
    }

    /// Objects in registration order.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectInfo> + '_ {
        self.objects.values()
    }

    pub fn object(&self, id: &str) -> Option<&ObjectInfo> {
        self.objects.get(id)
    }

    pub fn object_ids(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Bumped on every successful mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
