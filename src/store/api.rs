//! Store API
//!
//! Public interface for preference storage.

pub use crate::store::error::{StoreError, StoreResult};
pub use crate::store::file::FileStore;
pub use crate::store::memory::MemoryStore;
pub use crate::store::traits::KeyValueStore;
