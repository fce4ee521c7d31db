//! Scan Flow
//!
//! The operator-facing state machine: idle, scanning, validating, then
//! success or a classified error. Rules live in the pure `state::transition`
//! function; `machine::ScanFlow` is the async shell that owns the scanner
//! engine, gates decoded input (extraction, deduplication, single flight)
//! and calls the `ValidationService`.
//!
//! ## Core Features
//!
//! - **Pure transitions**: `transition(&FlowState, FlowEvent) -> (FlowState, Vec<Effect>)`
//! - **Actor shell**: one task owns the state, observable through a watch channel
//! - **Single flight**: at most one validation in flight, stale results discarded
//! - **Error taxonomy**: backend codes, statuses and messages mapped to `FlowErrorKind`
//! - **HTTP backend**: `HttpValidationService` over `reqwest`

pub mod api;
pub mod error;
pub mod http;
pub mod machine;
pub mod service;
pub mod state;

#[cfg(test)]
mod tests;
