//! Scan flow error classification

use crate::flow::service::ValidationFailure;
use crate::scanner::api::ScanError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified reason a scan ended in the error state
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowErrorKind {
    NotFound,
    Expired,
    AlreadyUsed,
    InvalidPayload,
    NoStock,
    NetworkError,
    Scanner,
    Unknown,
}

// Checked in order; network first so "connection not found" is a network error
const MESSAGE_HINTS: [(FlowErrorKind, &[&str]); 6] = [
    (
        FlowErrorKind::NetworkError,
        &[
            "network",
            "timeout",
            "timed out",
            "connection",
            "fetch",
            "offline",
            "unreachable",
            "dns",
        ],
    ),
    (
        FlowErrorKind::NoStock,
        &["no stock", "out of stock", "sin stock", "stock agotado", "no boxes"],
    ),
    (
        FlowErrorKind::AlreadyUsed,
        &[
            "already used",
            "already claimed",
            "already redeemed",
            "ya fue",
            "utilizado",
            "canjeado",
        ],
    ),
    (
        FlowErrorKind::Expired,
        &["expired", "vencid", "expirad", "caducad"],
    ),
    (
        FlowErrorKind::NotFound,
        &["not found", "no encontrado", "no existe", "not registered"],
    ),
    (
        FlowErrorKind::InvalidPayload,
        &["invalid", "inválid", "malformed", "mal formad"],
    ),
];

impl FlowErrorKind {
    /// Map a backend error code, accepting common aliases
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized: String = code
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' || c == '.' { '_' } else { c })
            .collect();

        let kind = match normalized.as_str() {
            "not_found" | "notfound" | "rut_not_found" | "ticket_not_found"
            | "worker_not_found" | "no_encontrado" | "not_registered" => Self::NotFound,
            "expired" | "ticket_expired" | "cycle_expired" | "vencido" | "expirado" => {
                Self::Expired
            }
            "already_used" | "used" | "already_claimed" | "already_redeemed" | "consumed"
            | "ticket_used" | "duplicate" | "ya_utilizado" => Self::AlreadyUsed,
            "invalid_payload" | "invalid" | "invalid_rut" | "invalid_ticket" | "invalid_uuid"
            | "malformed" | "bad_request" | "validation_error" => Self::InvalidPayload,
            "no_stock" | "out_of_stock" | "stock_exhausted" | "insufficient_stock"
            | "sin_stock" => Self::NoStock,
            "network_error" | "network" | "timeout" | "offline" | "connection_error" => {
                Self::NetworkError
            }
            "scanner" | "scanner_error" | "camera_error" => Self::Scanner,
            "unknown" => Self::Unknown,
            _ => return None,
        };
        Some(kind)
    }

    /// Map an HTTP status the backend uses for its taxonomy
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400 | 422 => Some(Self::InvalidPayload),
            404 => Some(Self::NotFound),
            409 => Some(Self::AlreadyUsed),
            410 => Some(Self::Expired),
            408 | 502 | 503 | 504 => Some(Self::NetworkError),
            _ => None,
        }
    }

    /// Guess from a human-readable message
    pub fn from_message(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        MESSAGE_HINTS
            .iter()
            .find(|(_, hints)| hints.iter().any(|hint| lower.contains(hint)))
            .map(|(kind, _)| *kind)
    }

    /// Code first, then message, then status, else `Unknown`
    ///
    /// The status only decides when neither the code nor the message says
    /// anything; backends often answer every rejection with a generic 400.
    pub fn classify(failure: &ValidationFailure) -> Self {
        failure
            .code
            .as_deref()
            .and_then(Self::from_code)
            .or_else(|| Self::from_message(&failure.message))
            .or_else(|| failure.status.and_then(Self::from_status))
            .unwrap_or(Self::Unknown)
    }
}

/// Error carried by the flow's error state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct FlowError {
    pub kind: FlowErrorKind,
    pub message: String,
}

impl FlowError {
    pub fn new(kind: FlowErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&ValidationFailure> for FlowError {
    fn from(failure: &ValidationFailure) -> Self {
        Self::new(FlowErrorKind::classify(failure), failure.message.clone())
    }
}

impl From<ValidationFailure> for FlowError {
    fn from(failure: ValidationFailure) -> Self {
        Self::from(&failure)
    }
}

impl From<&ScanError> for FlowError {
    fn from(error: &ScanError) -> Self {
        Self::new(FlowErrorKind::Scanner, error.to_string())
    }
}

impl crate::core::error_handling::ContextualError for FlowError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self.kind, FlowErrorKind::Unknown)
    }

    fn user_message(&self) -> Option<String> {
        if self.is_user_actionable() {
            Some(self.message.clone())
        } else {
            None
        }
    }
}

/// Failure to reach the flow itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowControlError {
    #[error("scan flow has shut down")]
    Closed,
    #[error("timed out waiting for the scan flow")]
    Timeout,
}

impl crate::core::error_handling::ContextualError for FlowControlError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<String> {
        None
    }
}
