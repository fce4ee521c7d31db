//! JSON file store
//!
//! The whole file is one JSON object of string values. It is read once on
//! open and rewritten on every change (temp file + rename, so a crash never
//! leaves a half-written file). Keys are stored as `{scope}.{key}`. A change
//! reaches memory only after it reached the disk.

use crate::core::sync::handle_mutex_poison;
use crate::store::error::{StoreError, StoreResult};
use crate::store::traits::KeyValueStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    scope: String,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) a store file; keys are prefixed with `scope`
    pub fn open(path: impl Into<PathBuf>, scope: &str) -> StoreResult<Self> {
        let path = path.into();
        let entries = load_entries(&path)?;
        log::debug!(
            "Opened store {} ({} entries, scope '{}')",
            path.display(),
            entries.len(),
            scope
        );

        Ok(Self {
            path,
            scope: scope.to_string(),
            entries: Mutex::new(entries),
        })
    }

    /// `<config dir>/Totemscan/store.json`, when the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Totemscan").join("store.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn scoped(&self, key: &str) -> String {
        if self.scope.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.scope, key)
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_error)?;
            }
        }

        let contents =
            serde_json::to_string_pretty(entries).map_err(|source| StoreError::Serialization {
                path: self.path.clone(),
                source,
            })?;

        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, contents).map_err(io_error)?;
        std::fs::rename(&temp, &self.path).map_err(io_error)
    }
}

fn load_entries(path: &Path) -> StoreResult<BTreeMap<String, String>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&contents).map_err(|source| StoreError::Serialization {
        path: path.to_path_buf(),
        source,
    })
}

fn lock_error(message: String) -> StoreError {
    StoreError::Lock { message }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = handle_mutex_poison(self.entries.lock(), lock_error)?;
        Ok(entries.get(&self.scoped(key)).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = handle_mutex_poison(self.entries.lock(), lock_error)?;
        let scoped = self.scoped(key);
        if entries.get(&scoped).map(String::as_str) == Some(value) {
            return Ok(());
        }

        let mut updated = entries.clone();
        updated.insert(scoped, value.to_string());
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = handle_mutex_poison(self.entries.lock(), lock_error)?;
        let scoped = self.scoped(key);
        if !entries.contains_key(&scoped) {
            return Ok(());
        }

        let mut updated = entries.clone();
        updated.remove(&scoped);
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }
}
