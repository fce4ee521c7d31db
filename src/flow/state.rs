//! Scan flow states and the pure transition function
//!
//! `transition` holds every rule of the flow and performs no I/O; the
//! `ScanFlow` shell feeds it events and carries out the effects it returns.
//!
//! ```text
//! idle --start--> scanning --scanned--> validating --validated--> success
//!   ^                |                      |                       |
//!   +------stop------+                      +--rejected--> error    |
//!   +--------------------- reset (any) ---------------------+       |
//!                  scanning <------------- confirm -----------------+
//! ```

use crate::flow::error::FlowError;
use crate::flow::service::{ScannedValue, ValidatedEntity};
use serde::Serialize;

/// Identifies one validation request; results for another attempt are stale
pub type AttemptId = u64;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlowState {
    /// No camera session, nothing pending
    #[default]
    Idle,
    /// Camera running, waiting for a valid scan
    Scanning,
    /// One validation request in flight
    Validating {
        value: ScannedValue,
        attempt: AttemptId,
    },
    Success {
        value: ScannedValue,
        entity: ValidatedEntity,
    },
    /// Terminal until reset
    Error { error: FlowError },
}

/// State names without payload
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum_macros::Display, strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowStatus {
    Idle,
    Scanning,
    Validating,
    Success,
    Error,
}

impl FlowState {
    pub fn status(&self) -> FlowStatus {
        match self {
            FlowState::Idle => FlowStatus::Idle,
            FlowState::Scanning => FlowStatus::Scanning,
            FlowState::Validating { .. } => FlowStatus::Validating,
            FlowState::Success { .. } => FlowStatus::Success,
            FlowState::Error { .. } => FlowStatus::Error,
        }
    }

    /// Scanning or validating: the camera is (or should be) running
    pub fn is_active(&self) -> bool {
        matches!(self, FlowState::Scanning | FlowState::Validating { .. })
    }

    pub fn accepts_scans(&self) -> bool {
        matches!(self, FlowState::Scanning)
    }

    pub fn error(&self) -> Option<&FlowError> {
        match self {
            FlowState::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Start,
    Stop,
    Reset,
    /// A deduplicated, extracted value from the scanner
    Scanned {
        value: ScannedValue,
        attempt: AttemptId,
    },
    Validated {
        attempt: AttemptId,
        entity: ValidatedEntity,
    },
    Rejected {
        attempt: AttemptId,
        error: FlowError,
    },
    CameraFailed {
        error: FlowError,
    },
    /// Confirm the success and continue scanning
    Confirm,
    ConfirmFailed {
        error: FlowError,
    },
}

/// Side effects requested by a transition, executed in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartCamera,
    StopCamera,
    Validate {
        value: ScannedValue,
        attempt: AttemptId,
    },
    /// Abort the in-flight validation request
    CancelValidation,
    Confirm {
        value: ScannedValue,
        entity: ValidatedEntity,
    },
}

/// Next state and effects for `event` in `state`
///
/// Events that do not apply to the current state (a scan while validating,
/// a result for an old attempt, a confirm outside success) leave the state
/// unchanged with no effects.
pub fn transition(state: &FlowState, event: FlowEvent) -> (FlowState, Vec<Effect>) {
    use FlowEvent as E;
    use FlowState as S;

    match (state, event) {
        (S::Idle, E::Start) => (S::Scanning, vec![Effect::StartCamera]),

        (S::Idle, E::Stop | E::Reset) => (S::Idle, Vec::new()),
        (S::Scanning, E::Stop | E::Reset) => (S::Idle, vec![Effect::StopCamera]),
        (S::Validating { .. }, E::Stop | E::Reset) => (
            S::Idle,
            vec![Effect::CancelValidation, Effect::StopCamera],
        ),
        (S::Success { .. } | S::Error { .. }, E::Stop | E::Reset) => {
            (S::Idle, vec![Effect::StopCamera])
        }

        (S::Scanning, E::Scanned { value, attempt }) => (
            S::Validating {
                value: value.clone(),
                attempt,
            },
            vec![Effect::Validate { value, attempt }],
        ),

        (
            S::Validating {
                value,
                attempt: current,
            },
            E::Validated { attempt, entity },
        ) if *current == attempt => (
            S::Success {
                value: value.clone(),
                entity,
            },
            vec![Effect::StopCamera],
        ),

        (S::Validating { attempt: current, .. }, E::Rejected { attempt, error })
            if *current == attempt =>
        {
            (S::Error { error }, vec![Effect::StopCamera])
        }

        (S::Scanning, E::CameraFailed { error }) => (S::Error { error }, vec![Effect::StopCamera]),
        (S::Validating { .. }, E::CameraFailed { error }) => (
            S::Error { error },
            vec![Effect::CancelValidation, Effect::StopCamera],
        ),

        (S::Success { value, entity }, E::Confirm) => (
            S::Scanning,
            vec![
                Effect::Confirm {
                    value: value.clone(),
                    entity: entity.clone(),
                },
                Effect::StartCamera,
            ],
        ),

        (S::Scanning, E::ConfirmFailed { error }) => {
            (S::Error { error }, vec![Effect::StopCamera])
        }

        (current, _) => (current.clone(), Vec::new()),
    }
}
