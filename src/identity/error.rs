//! Identity error types

use thiserror::Error;

/// Reasons a string is not a valid identity number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identity number is empty")]
    Empty,
    #[error("'{input}' is not a RUN/RUT (expected 1-8 digits plus a check character)")]
    Malformed { input: String },
    #[error("check character '{found}' does not match expected '{expected}'")]
    ChecksumMismatch { expected: char, found: char },
}

impl crate::core::error_handling::ContextualError for IdentityError {
    fn is_user_actionable(&self) -> bool {
        true // Always caused by the typed or scanned input
    }

    fn user_message(&self) -> Option<String> {
        Some(self.to_string())
    }
}
