//! Store error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store file {path} is not valid JSON: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store lock error: {message}")]
    Lock { message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl crate::core::error_handling::ContextualError for StoreError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, StoreError::Serialization { .. })
    }

    fn user_message(&self) -> Option<String> {
        match self {
            StoreError::Serialization { path, .. } => Some(format!(
                "Preference file {} is corrupted; delete it to start fresh",
                path.display()
            )),
            _ => None,
        }
    }
}
