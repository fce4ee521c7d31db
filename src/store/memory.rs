//! In-memory store

use crate::core::sync::handle_mutex_poison;
use crate::store::error::{StoreError, StoreResult};
use crate::store::traits::KeyValueStore;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_error(message: String) -> StoreError {
    StoreError::Lock { message }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = handle_mutex_poison(self.entries.lock(), lock_error)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = handle_mutex_poison(self.entries.lock(), lock_error)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = handle_mutex_poison(self.entries.lock(), lock_error)?;
        entries.remove(key);
        Ok(())
    }
}
