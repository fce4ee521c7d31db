//! Scan flow API
//!
//! Public API for the scan flow, consolidating external exports.

// Flow handle and builder
pub use crate::flow::machine::{FlowCounters, FlowStatistics, ScanFlow, ScanFlowBuilder};

// States and transitions
pub use crate::flow::state::{transition, AttemptId, Effect, FlowEvent, FlowState, FlowStatus};

// Validation contract
pub use crate::flow::service::{
    FlowMode, ScannedValue, ValidatedEntity, ValidationFailure, ValidationService,
};
pub use crate::flow::http::{Endpoints, HttpValidationService, DEFAULT_REQUEST_TIMEOUT};

// Error handling
pub use crate::flow::error::{FlowControlError, FlowError, FlowErrorKind};
