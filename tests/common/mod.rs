//! Common test utilities for integration tests
//!
//! A keyboard-wedge camera fed through an in-memory pipe, and a validation
//! backend that counts calls.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};
use totemscan::flow::api::{
    FlowMode, FlowState, FlowStatus, ScanFlow, ScannedValue, ValidatedEntity, ValidationFailure,
    ValidationService,
};
use totemscan::scanner::api::{WedgeCamera, WedgeDecoder};

pub const WAIT: Duration = Duration::from_secs(5);

/// Writing end of a wedge camera
pub struct Typist {
    writer: DuplexStream,
}

impl Typist {
    /// Type a payload followed by Enter
    pub async fn scan(&mut self, payload: &str) {
        self.writer
            .write_all(format!("{}\n", payload).as_bytes())
            .await
            .expect("wedge pipe open");
        self.writer.flush().await.expect("wedge pipe open");
    }
}

pub fn wedge() -> (WedgeCamera, Typist) {
    let (writer, reader) = tokio::io::duplex(64 * 1024);
    (WedgeCamera::from_reader(reader), Typist { writer })
}

/// Backend that accepts everything, or rejects with a fixed failure
#[derive(Default)]
pub struct CountingService {
    pub validations: AtomicUsize,
    pub confirmations: AtomicUsize,
    pub seen: Mutex<Vec<ScannedValue>>,
    rejection: Option<ValidationFailure>,
}

impl CountingService {
    pub fn rejecting(failure: ValidationFailure) -> Self {
        Self {
            rejection: Some(failure),
            ..Self::default()
        }
    }

    pub fn validation_count(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValidationService for CountingService {
    async fn validate(&self, value: &ScannedValue) -> Result<ValidatedEntity, ValidationFailure> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(value.clone());
        match &self.rejection {
            Some(failure) => Err(failure.clone()),
            None => Ok(ValidatedEntity::from_json(
                json!({"id": value.to_string(), "full_name": "Juan Perez"}),
            )),
        }
    }

    async fn confirm(
        &self,
        _value: &ScannedValue,
        _entity: &ValidatedEntity,
    ) -> Result<(), ValidationFailure> {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Flow over a wedge pipe, already scanning
pub async fn scanning_flow(
    mode: FlowMode,
    service: Arc<dyn ValidationService>,
) -> (ScanFlow, Typist) {
    let (camera, typist) = wedge();
    let flow = ScanFlow::builder(Arc::new(camera), Arc::new(WedgeDecoder), service)
        .mode(mode)
        .build();

    flow.start().expect("flow running");
    wait_status(&flow, FlowStatus::Scanning).await;
    (flow, typist)
}

pub async fn wait_status(flow: &ScanFlow, status: FlowStatus) -> FlowState {
    flow.wait_for(WAIT, |state| state.status() == status)
        .await
        .unwrap_or_else(|e| panic!("waiting for {}: {} (state {:?})", status, e, flow.state()))
}

/// Poll `check` until it holds or the wait budget runs out
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
