//! Small persistent key-value storage
//!
//! Remembers operator preferences across runs (the last camera chosen).
//! `FileStore` keeps a JSON object under the user config directory with keys
//! scoped by a prefix so several stations can share one file; `MemoryStore`
//! serves tests and ephemeral sessions.

pub mod api;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;
