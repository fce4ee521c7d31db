//! Store trait definitions

use crate::store::error::StoreResult;

/// String key-value storage shared between components
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key; removing a missing key is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;
}
