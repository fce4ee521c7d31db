//! CLI output formatting

use crate::flow::api::FlowState;
use crate::identity::api::{
    extract_fields, extract_ticket_id, format as format_rut, has_format, parse, IdentityError,
    IdentityExtractor,
};
use crate::scanner::api::DeviceInfo;
use colored::Colorize;
use serde_json::{json, Value};

/// One line describing a typed RUT, plus whether it is valid
pub fn validation_line(input: &str, use_color: bool) -> (String, bool) {
    if !has_format(input) {
        let line = format!("'{}' is not a RUT", input.trim());
        return (paint(line, use_color, Tone::Bad), false);
    }

    let formatted = format_rut(input);
    match parse(input) {
        Ok(_) => (paint(format!("{} valid", formatted), use_color, Tone::Good), true),
        Err(IdentityError::ChecksumMismatch { expected, .. }) => (
            paint(
                format!("{} invalid (expected check digit {})", formatted, expected),
                use_color,
                Tone::Bad,
            ),
            false,
        ),
        Err(e) => (paint(e.to_string(), use_color, Tone::Bad), false),
    }
}

/// JSON report for `extract`: identity, ticket and printed fields
pub fn extraction_report(text: &str, extractor: &IdentityExtractor) -> Value {
    let found = extractor.extract_details(text);
    let fields = extract_fields(text);

    json!({
        "identity": found.as_ref().map(|f| f.identity.to_string()),
        "formatted": found.as_ref().map(|f| f.identity.formatted()),
        "family": found.as_ref().and_then(|f| f.family).map(|family| family.to_string()),
        "position": found.as_ref().map(|f| f.position),
        "ticket": extract_ticket_id(text).map(|t| t.hyphenated().to_string()),
        "fields": fields,
    })
}

/// Operator-facing line for a flow state
pub fn describe_state(state: &FlowState, use_color: bool) -> String {
    match state {
        FlowState::Idle => paint("idle".to_string(), use_color, Tone::Plain),
        FlowState::Scanning => paint("scanning".to_string(), use_color, Tone::Plain),
        FlowState::Validating { value, .. } => {
            paint(format!("validating {}", value), use_color, Tone::Busy)
        }
        FlowState::Success { value, entity } => {
            let line = match &entity.holder {
                Some(holder) => format!("success {} {}", value, holder),
                None => format!("success {}", value),
            };
            paint(line, use_color, Tone::Good)
        }
        FlowState::Error { error } => paint(
            format!("error {}: {}", error.kind, error.message),
            use_color,
            Tone::Bad,
        ),
    }
}

pub fn device_line(device: &DeviceInfo, remembered: bool) -> String {
    let marker = if remembered { "*" } else { " " };
    format!("{} {:<20} {}", marker, device.id, device.label)
}

enum Tone {
    Plain,
    Busy,
    Good,
    Bad,
}

fn paint(line: String, use_color: bool, tone: Tone) -> String {
    if !use_color {
        return line;
    }
    match tone {
        Tone::Plain => line.dimmed().to_string(),
        Tone::Busy => line.yellow().to_string(),
        Tone::Good => line.green().bold().to_string(),
        Tone::Bad => line.red().bold().to_string(),
    }
}
