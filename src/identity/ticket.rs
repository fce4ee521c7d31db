//! Guard-station ticket identifiers
//!
//! Tickets are printed as QR codes holding either a bare UUID, a JSON object
//! with the id under one of a few keys, or a verification URL.

use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

static UUID_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b")
        .expect("uuid pattern is valid")
});

/// Keys that carry the ticket id, in lookup order
const TICKET_KEYS: [&str; 4] = ["ticket", "uuid", "id", "code"];

/// Ticket id in a scanned payload, if any
pub fn extract_ticket_id(text: &str) -> Option<Uuid> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    from_json(trimmed)
        .or_else(|| from_url_query(trimmed))
        .or_else(|| {
            UUID_SHAPE
                .find_iter(trimmed)
                .find_map(|m| Uuid::parse_str(m.as_str()).ok())
        })
}

fn from_json(text: &str) -> Option<Uuid> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;

    TICKET_KEYS.iter().find_map(|key| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_str())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
    })
}

fn from_url_query(text: &str) -> Option<Uuid> {
    let url = reqwest::Url::parse(text).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    TICKET_KEYS.iter().find_map(|key| {
        pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| Uuid::parse_str(v.trim()).ok())
    })
}
