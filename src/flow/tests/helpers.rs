//! Test helpers for scan flow tests

use crate::core::time::MockTimeProvider;
use crate::flow::machine::ScanFlow;
use crate::flow::service::{
    FlowMode, ScannedValue, ValidatedEntity, ValidationFailure, ValidationService,
};
use crate::flow::state::FlowState;
use crate::scanner::tests::helpers::{ScriptedCamera, ScriptedDecoder};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub use crate::scanner::tests::helpers::{eventually, Step, CORRUPT, NO_CODE};

pub const VALID_CARD: &str = "RUN: 12.345.678-5 NOMBRES: JUAN";
pub const OTHER_CARD: &str = "https://portal.sidiv.registrocivil.cl/docstatus?RUN=11222333-9&type=CEDULA";
pub const BAD_CHECKSUM: &str = "RUN 12345678-9";
pub const TICKET: &str = "6f1c2a4e-8b3d-4c5e-9f70-1a2b3c4d5e6f";

/// How the scripted backend answers the next validation
pub enum Reply {
    Accept,
    Reject(ValidationFailure),
    /// Wait for `release()` then accept
    Hold,
    Panic,
}

/// Validation backend answering from a script; accepts when the script is empty
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Reply>>,
    confirm_failure: Mutex<Option<ValidationFailure>>,
    hold_confirm: Mutex<bool>,
    gate: Notify,
    confirm_gate: Notify,
    confirm_failures: Mutex<usize>,
    pub validated: Mutex<Vec<ScannedValue>>,
    pub confirmed: Mutex<Vec<(ScannedValue, String)>>,
}

impl ScriptedService {
    pub fn reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn fail_next_confirm(&self, failure: ValidationFailure) {
        *self.confirm_failure.lock().unwrap() = Some(failure);
    }

    /// Make the next confirm wait for `release_confirm()`
    pub fn hold_next_confirm(&self) {
        *self.hold_confirm.lock().unwrap() = true;
    }

    pub fn release_confirm(&self) {
        self.confirm_gate.notify_one();
    }

    pub fn confirm_failures(&self) -> usize {
        *self.confirm_failures.lock().unwrap()
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn validated(&self) -> Vec<ScannedValue> {
        self.validated.lock().unwrap().clone()
    }

    pub fn confirm_count(&self) -> usize {
        self.confirmed.lock().unwrap().len()
    }
}

#[async_trait]
impl ValidationService for ScriptedService {
    async fn validate(&self, value: &ScannedValue) -> Result<ValidatedEntity, ValidationFailure> {
        self.validated.lock().unwrap().push(value.clone());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Accept);

        match reply {
            Reply::Accept => {}
            Reply::Reject(failure) => return Err(failure),
            Reply::Hold => self.gate.notified().await,
            Reply::Panic => panic!("backend exploded"),
        }
        Ok(ValidatedEntity::from_json(
            json!({"id": format!("entity-{}", value), "name": "Juan Perez"}),
        ))
    }

    async fn confirm(
        &self,
        value: &ScannedValue,
        entity: &ValidatedEntity,
    ) -> Result<(), ValidationFailure> {
        let failure = self.confirm_failure.lock().unwrap().take();
        let hold = std::mem::take(&mut *self.hold_confirm.lock().unwrap());
        if hold {
            self.confirm_gate.notified().await;
        }
        if let Some(failure) = failure {
            *self.confirm_failures.lock().unwrap() += 1;
            return Err(failure);
        }
        self.confirmed
            .lock()
            .unwrap()
            .push((value.clone(), entity.id.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub flow: ScanFlow,
    pub camera: Arc<ScriptedCamera>,
    pub service: Arc<ScriptedService>,
    pub time: MockTimeProvider,
}

impl Harness {
    pub fn new(mode: FlowMode) -> Self {
        let camera = Arc::new(ScriptedCamera::with_two_devices());
        let service = Arc::new(ScriptedService::default());
        let time = MockTimeProvider::new();

        let flow = ScanFlow::builder(camera.clone(), Arc::new(ScriptedDecoder), service.clone())
            .mode(mode)
            .time_provider(Arc::new(time.clone()))
            .build();

        Self {
            flow,
            camera,
            service,
            time,
        }
    }

    /// Start and wait until the camera is live
    pub async fn scanning(mode: FlowMode) -> Self {
        let harness = Self::new(mode);
        harness.flow.start().unwrap();
        harness.wait(|s| *s == FlowState::Scanning).await;
        eventually(|| harness.camera.live_tracks() == 1).await;
        harness
    }

    pub async fn wait(&self, predicate: impl FnMut(&FlowState) -> bool) -> FlowState {
        self.flow
            .wait_for(Duration::from_secs(2), predicate)
            .await
            .unwrap_or_else(|e| panic!("{} (state {:?})", e, self.flow.state()))
    }
}
