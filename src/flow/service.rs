//! Validation service contract
//!
//! The backend decides whether a scanned identity or ticket entitles its
//! holder to a benefit box. The flow only sees this trait; the REST client
//! lives in `flow::http`.

use crate::identity::api::{extract_ticket_id, IdentityExtractor, IdentityNumber};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What the station scans
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowMode {
    /// Totem: national ID cards
    #[default]
    Identity,
    /// Guard station: issued ticket QR codes
    Ticket,
}

/// A scanned payload reduced to the value that gets validated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScannedValue {
    Identity(IdentityNumber),
    Ticket(Uuid),
}

impl ScannedValue {
    /// Extract the value for `mode` from decoded text
    pub fn from_text(mode: FlowMode, extractor: &IdentityExtractor, text: &str) -> Option<Self> {
        match mode {
            FlowMode::Identity => extractor.extract(text).map(ScannedValue::Identity),
            FlowMode::Ticket => extract_ticket_id(text).map(ScannedValue::Ticket),
        }
    }

    /// Deduplication key
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn mode(&self) -> FlowMode {
        match self {
            ScannedValue::Identity(_) => FlowMode::Identity,
            ScannedValue::Ticket(_) => FlowMode::Ticket,
        }
    }
}

impl fmt::Display for ScannedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannedValue::Identity(id) => write!(f, "{}", id),
            ScannedValue::Ticket(ticket) => write!(f, "{}", ticket.hyphenated()),
        }
    }
}

/// Backend entity a successful validation returns (worker, ticket)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedEntity {
    pub id: String,
    /// Display name of the benefit holder, when the backend sends one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    /// Full response body
    pub payload: serde_json::Value,
}

const ID_KEYS: [&str; 4] = ["id", "uuid", "ticket_id", "rut"];
const HOLDER_KEYS: [&str; 4] = ["holder", "full_name", "name", "nombre"];

impl ValidatedEntity {
    /// Build from a JSON response, unwrapping a top-level `data` object
    pub fn from_json(value: serde_json::Value) -> Self {
        let body = match value.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => value,
        };

        let id = ID_KEYS
            .iter()
            .find_map(|key| match body.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default();

        let holder = HOLDER_KEYS.iter().find_map(|key| {
            body.get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        });

        Self {
            id,
            holder,
            payload: body,
        }
    }
}

/// A rejected validation or confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Machine-readable code from the backend taxonomy
    pub code: Option<String>,
    pub message: String,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationFailure {}

/// Backend checks behind the scan flow
#[async_trait]
pub trait ValidationService: Send + Sync {
    /// Check a scanned value and return the entity it refers to
    async fn validate(&self, value: &ScannedValue) -> Result<ValidatedEntity, ValidationFailure>;

    /// Finalize a success (hand the box over, redeem the ticket)
    async fn confirm(
        &self,
        value: &ScannedValue,
        entity: &ValidatedEntity,
    ) -> Result<(), ValidationFailure>;
}
