//! Scan flow shell
//!
//! `ScanFlow` owns one actor task. Control commands, decoded results from the
//! scanner engine and validation outcomes all arrive on a single channel, so
//! the state is only ever touched by the actor and needs no lock. Each event
//! goes through `transition`; the actor then carries out the returned
//! effects (camera start/stop, spawning or aborting validation requests).
//!
//! Validation requests run in their own task tagged with an attempt id. A
//! reset or stop aborts the task, and any result that still arrives for an
//! old attempt is dropped by the transition function.
//!
//! Confirmations are never aborted, so they are tagged with the session that
//! issued them instead. Stop and reset open a new session; a confirm failure
//! from an older one is dropped. A failure for the current session that
//! arrives while the next card is validating or shown as a success is held
//! back and lands in `error` once the flow is scanning again.

use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::flow::error::{FlowControlError, FlowError, FlowErrorKind};
use crate::flow::service::{FlowMode, ScannedValue, ValidatedEntity, ValidationService};
use crate::flow::state::{transition, AttemptId, Effect, FlowEvent, FlowState, FlowStatus};
use crate::identity::api::{ExtractionPolicy, IdentityExtractor};
use crate::scanner::api::{
    BarcodeDecoder, CameraProvider, DeviceSelector, ScanDeduplicator, ScanError, ScanHandler,
    ScanResult, ScannerConfig, ScannerEngine, DEFAULT_DEDUP_WINDOW,
};
use crate::store::api::KeyValueStore;
use futures::FutureExt;
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};

/// Operator commands
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Start { device_id: Option<String> },
    Stop,
    Reset,
    Confirm,
    Shutdown,
}

/// Everything the actor reacts to
enum Input {
    Command(Command),
    Decoded(ScanResult),
    ScannerFailed(ScanError),
    ValidationDone {
        attempt: AttemptId,
        result: Result<ValidatedEntity, FlowError>,
    },
    ConfirmDone {
        session: SessionId,
        value: ScannedValue,
        result: Result<(), FlowError>,
    },
}

/// Counts stop/reset cycles; confirmations are scoped to one
type SessionId = u64;

/// Activity counters for the flow
#[derive(Debug, Default)]
pub struct FlowCounters {
    decoded: AtomicUsize,
    decode_errors: AtomicUsize,
    extraction_misses: AtomicUsize,
    duplicates_suppressed: AtomicUsize,
    dropped_while_busy: AtomicUsize,
    validations_started: AtomicUsize,
    stale_results: AtomicUsize,
}

/// Point-in-time copy of `FlowCounters`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlowStatistics {
    pub decoded: usize,
    pub decode_errors: usize,
    pub extraction_misses: usize,
    pub duplicates_suppressed: usize,
    pub dropped_while_busy: usize,
    pub validations_started: usize,
    pub stale_results: usize,
}

impl FlowCounters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FlowStatistics {
        FlowStatistics {
            decoded: self.decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            extraction_misses: self.extraction_misses.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            dropped_while_busy: self.dropped_while_busy.load(Ordering::Relaxed),
            validations_started: self.validations_started.load(Ordering::Relaxed),
            stale_results: self.stale_results.load(Ordering::Relaxed),
        }
    }
}

/// Forwards scanner output into the actor channel
struct FlowScanHandler {
    inputs: mpsc::UnboundedSender<Input>,
}

impl ScanHandler for FlowScanHandler {
    fn on_result(&self, result: ScanResult) {
        let _ = self.inputs.send(Input::Decoded(result));
    }

    fn on_error(&self, error: ScanError) {
        let _ = self.inputs.send(Input::ScannerFailed(error));
    }
}

/// Builder for `ScanFlow`
pub struct ScanFlowBuilder {
    camera: Arc<dyn CameraProvider>,
    decoder: Arc<dyn BarcodeDecoder>,
    service: Arc<dyn ValidationService>,
    mode: FlowMode,
    scanner_config: Option<ScannerConfig>,
    dedup_window: Duration,
    extraction_policy: ExtractionPolicy,
    device_store: Option<Arc<dyn KeyValueStore>>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ScanFlowBuilder {
    pub fn mode(mut self, mode: FlowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn scanner_config(mut self, config: ScannerConfig) -> Self {
        self.scanner_config = Some(config);
        self
    }

    pub fn dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    pub fn extraction_policy(mut self, policy: ExtractionPolicy) -> Self {
        self.extraction_policy = policy;
        self
    }

    pub fn device_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.device_store = Some(store);
        self
    }

    pub fn time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time;
        self
    }

    /// Spawn the actor; must be called within a tokio runtime
    pub fn build(self) -> ScanFlow {
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(FlowState::Idle);
        let counters = Arc::new(FlowCounters::default());

        let scanner_config = self.scanner_config.unwrap_or_else(|| match self.mode {
            FlowMode::Identity => ScannerConfig::default(),
            FlowMode::Ticket => ScannerConfig::tickets(),
        });
        let engine = Arc::new(ScannerEngine::new(
            self.camera,
            self.decoder,
            Arc::new(FlowScanHandler {
                inputs: inputs_tx.clone(),
            }),
            scanner_config,
            DeviceSelector::new(self.device_store),
        ));

        let actor = FlowActor {
            state: state_tx,
            inputs_tx: inputs_tx.clone(),
            engine: Arc::clone(&engine),
            service: self.service,
            mode: self.mode,
            extractor: IdentityExtractor::new(self.extraction_policy),
            dedup: ScanDeduplicator::new(self.dedup_window),
            time: self.time_provider,
            counters: Arc::clone(&counters),
            next_attempt: 1,
            in_flight: None,
            device_id: None,
            session: 0,
            deferred_confirm_failure: None,
        };
        let task = tokio::spawn(actor.run(inputs_rx));

        log::debug!("Scan flow created (mode {})", self.mode);
        ScanFlow {
            inputs: inputs_tx,
            state: state_rx,
            engine,
            counters,
            mode: self.mode,
            actor: Some(task),
        }
    }
}

/// Handle to a running scan flow
///
/// Commands are queued to the actor and return immediately; observe the
/// outcome through `state`, `subscribe` or `wait_for`. Dropping the handle
/// stops the camera and the actor.
pub struct ScanFlow {
    inputs: mpsc::UnboundedSender<Input>,
    state: watch::Receiver<FlowState>,
    engine: Arc<ScannerEngine>,
    counters: Arc<FlowCounters>,
    mode: FlowMode,
    actor: Option<JoinHandle<()>>,
}

impl ScanFlow {
    pub fn builder(
        camera: Arc<dyn CameraProvider>,
        decoder: Arc<dyn BarcodeDecoder>,
        service: Arc<dyn ValidationService>,
    ) -> ScanFlowBuilder {
        ScanFlowBuilder {
            camera,
            decoder,
            service,
            mode: FlowMode::default(),
            scanner_config: None,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            extraction_policy: ExtractionPolicy::default(),
            device_store: None,
            time_provider: Arc::new(SystemTimeProvider),
        }
    }

    fn send(&self, command: Command) -> Result<(), FlowControlError> {
        self.inputs
            .send(Input::Command(command))
            .map_err(|_| FlowControlError::Closed)
    }

    /// Start scanning with the remembered or rear-facing camera
    pub fn start(&self) -> Result<(), FlowControlError> {
        self.send(Command::Start { device_id: None })
    }

    pub fn start_with_device(&self, device_id: &str) -> Result<(), FlowControlError> {
        self.send(Command::Start {
            device_id: Some(device_id.to_string()),
        })
    }

    pub fn stop(&self) -> Result<(), FlowControlError> {
        self.send(Command::Stop)
    }

    pub fn reset(&self) -> Result<(), FlowControlError> {
        self.send(Command::Reset)
    }

    /// Finalize a success and go back to scanning
    pub fn confirm(&self) -> Result<(), FlowControlError> {
        self.send(Command::Confirm)
    }

    pub fn state(&self) -> FlowState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state.clone()
    }

    /// Wait until the state satisfies `predicate`, returning that state
    pub async fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl FnMut(&FlowState) -> bool,
    ) -> Result<FlowState, FlowControlError> {
        let mut state = self.state.clone();
        let outcome = tokio::time::timeout(timeout, state.wait_for(predicate)).await;
        match outcome {
            Ok(Ok(found)) => Ok(found.clone()),
            Ok(Err(_)) => Err(FlowControlError::Closed),
            Err(_) => Err(FlowControlError::Timeout),
        }
    }

    pub fn mode(&self) -> FlowMode {
        self.mode
    }

    pub fn statistics(&self) -> FlowStatistics {
        self.counters.snapshot()
    }

    /// The underlying engine (torch, device listing)
    pub fn engine(&self) -> &Arc<ScannerEngine> {
        &self.engine
    }

    /// Stop the camera and wait for the actor to finish
    pub async fn shutdown(mut self) {
        let _ = self.send(Command::Shutdown);
        if let Some(actor) = self.actor.take() {
            if let Err(e) = actor.await {
                log::warn!("Scan flow actor ended abnormally: {}", e);
            }
        }
        self.engine.stop();
    }
}

impl Drop for ScanFlow {
    fn drop(&mut self) {
        self.engine.stop();
        if let Some(actor) = self.actor.take() {
            actor.abort();
        }
    }
}

struct FlowActor {
    state: watch::Sender<FlowState>,
    inputs_tx: mpsc::UnboundedSender<Input>,
    engine: Arc<ScannerEngine>,
    service: Arc<dyn ValidationService>,
    mode: FlowMode,
    extractor: IdentityExtractor,
    dedup: ScanDeduplicator,
    time: Arc<dyn TimeProvider>,
    counters: Arc<FlowCounters>,
    next_attempt: AttemptId,
    in_flight: Option<(AttemptId, AbortHandle)>,
    device_id: Option<String>,
    session: SessionId,
    deferred_confirm_failure: Option<FlowError>,
}

impl FlowActor {
    async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        while let Some(input) = inputs.recv().await {
            let event = match input {
                Input::Command(Command::Shutdown) => break,
                Input::Command(command) => self.command_event(command),
                Input::Decoded(result) => self.scan_event(result),
                Input::ScannerFailed(error) => self.scanner_event(error),
                Input::ValidationDone { attempt, result } => {
                    self.validation_event(attempt, result)
                }
                Input::ConfirmDone {
                    session,
                    value,
                    result,
                } => self.confirm_event(session, value, result),
            };

            if let Some(event) = event {
                self.apply(event).await;
            }
            if let Some(event) = self.take_deferred_confirm_failure() {
                self.apply(event).await;
            }
        }

        self.cancel_validation();
        self.engine.stop();
        log::debug!("Scan flow actor stopped");
    }

    fn command_event(&mut self, command: Command) -> Option<FlowEvent> {
        match command {
            Command::Start { device_id } => {
                self.device_id = device_id;
                Some(FlowEvent::Start)
            }
            Command::Stop => {
                self.end_session();
                Some(FlowEvent::Stop)
            }
            Command::Reset => {
                self.end_session();
                Some(FlowEvent::Reset)
            }
            Command::Confirm => Some(FlowEvent::Confirm),
            Command::Shutdown => None,
        }
    }

    fn end_session(&mut self) {
        self.dedup.reset();
        self.session += 1;
        if let Some(error) = self.deferred_confirm_failure.take() {
            log::warn!("Dropping unreported confirm failure: {}", error);
        }
    }

    // Gate order: busy, extraction, dedup. Only a value that passes all three
    // consumes an attempt id.
    fn scan_event(&mut self, result: ScanResult) -> Option<FlowEvent> {
        FlowCounters::bump(&self.counters.decoded);

        if !self.state.borrow().accepts_scans() {
            FlowCounters::bump(&self.counters.dropped_while_busy);
            log::trace!("Dropped scan while {}", self.state.borrow().status());
            return None;
        }

        let Some(value) = ScannedValue::from_text(self.mode, &self.extractor, &result.text) else {
            FlowCounters::bump(&self.counters.extraction_misses);
            log::trace!("No valid {} in {} scan", self.mode, result.format);
            return None;
        };

        if !self.dedup.should_accept(&value.key(), self.time.now()) {
            FlowCounters::bump(&self.counters.duplicates_suppressed);
            log::trace!("Suppressed duplicate scan of {}", value);
            return None;
        }

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        Some(FlowEvent::Scanned { value, attempt })
    }

    fn scanner_event(&mut self, error: ScanError) -> Option<FlowEvent> {
        if error.is_camera_failure() {
            log::warn!("Camera failure: {}", error);
            Some(FlowEvent::CameraFailed {
                error: FlowError::from(&error),
            })
        } else {
            FlowCounters::bump(&self.counters.decode_errors);
            log::debug!("Decode error (scanning continues): {}", error);
            None
        }
    }

    fn validation_event(
        &mut self,
        attempt: AttemptId,
        result: Result<ValidatedEntity, FlowError>,
    ) -> Option<FlowEvent> {
        match &self.in_flight {
            Some((current, _)) if *current == attempt => self.in_flight = None,
            _ => {
                FlowCounters::bump(&self.counters.stale_results);
                log::debug!("Discarding stale result for attempt {}", attempt);
            }
        }

        Some(match result {
            Ok(entity) => FlowEvent::Validated { attempt, entity },
            Err(error) => FlowEvent::Rejected { attempt, error },
        })
    }

    fn confirm_event(
        &mut self,
        session: SessionId,
        value: ScannedValue,
        result: Result<(), FlowError>,
    ) -> Option<FlowEvent> {
        let error = match result {
            Ok(()) => {
                log::info!("Confirmed {}", value);
                return None;
            }
            Err(error) => error,
        };
        log::warn!("Confirming {} failed: {}", value, error);

        if session != self.session {
            FlowCounters::bump(&self.counters.stale_results);
            log::debug!("Discarding confirm failure from session {}", session);
            return None;
        }

        let status = self.state.borrow().status();
        match status {
            FlowStatus::Scanning => Some(FlowEvent::ConfirmFailed { error }),
            FlowStatus::Validating | FlowStatus::Success => {
                log::debug!("Holding confirm failure until scanning resumes");
                self.deferred_confirm_failure = Some(error);
                None
            }
            FlowStatus::Idle | FlowStatus::Error => None,
        }
    }

    fn take_deferred_confirm_failure(&mut self) -> Option<FlowEvent> {
        if self.deferred_confirm_failure.is_none() || *self.state.borrow() != FlowState::Scanning {
            return None;
        }
        self.deferred_confirm_failure
            .take()
            .map(|error| FlowEvent::ConfirmFailed { error })
    }

    async fn apply(&mut self, event: FlowEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let current = self.state.borrow().clone();
            let (next, effects) = transition(&current, event);

            if next != current {
                log::debug!("Flow {} -> {}", current.status(), next.status());
                if let FlowState::Error { error } = &next {
                    log::warn!("Scan flow error ({}): {}", error.kind, error.message);
                }
                self.state.send_replace(next);
            }

            for effect in effects {
                if let Some(follow_up) = self.execute(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&mut self, effect: Effect) -> Option<FlowEvent> {
        match effect {
            Effect::StartCamera => match self.engine.start(self.device_id.as_deref()).await {
                Ok(device) => {
                    log::info!("Scanning with '{}'", device);
                    None
                }
                Err(ScanError::Cancelled) => {
                    log::info!("Camera stopped while starting");
                    self.end_session();
                    Some(FlowEvent::Stop)
                }
                Err(error) => {
                    log::warn!("Could not start camera: {}", error);
                    Some(FlowEvent::CameraFailed {
                        error: FlowError::from(&error),
                    })
                }
            },
            Effect::StopCamera => {
                self.engine.stop();
                None
            }
            Effect::Validate { value, attempt } => {
                self.spawn_validation(value, attempt);
                None
            }
            Effect::CancelValidation => {
                self.cancel_validation();
                None
            }
            Effect::Confirm { value, entity } => {
                self.spawn_confirm(value, entity);
                None
            }
        }
    }

    fn spawn_validation(&mut self, value: ScannedValue, attempt: AttemptId) {
        self.cancel_validation();
        FlowCounters::bump(&self.counters.validations_started);
        log::info!("Validating {} (attempt {})", value, attempt);

        let service = Arc::clone(&self.service);
        let inputs = self.inputs_tx.clone();
        let task = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(service.validate(&value))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(Ok(entity)) => Ok(entity),
                Ok(Err(failure)) => Err(FlowError::from(&failure)),
                Err(_) => Err(FlowError::new(
                    FlowErrorKind::Unknown,
                    "validation service panicked",
                )),
            };
            let _ = inputs.send(Input::ValidationDone { attempt, result });
        });

        self.in_flight = Some((attempt, task.abort_handle()));
    }

    fn cancel_validation(&mut self) {
        if let Some((attempt, handle)) = self.in_flight.take() {
            handle.abort();
            log::debug!("Cancelled validation attempt {}", attempt);
        }
    }

    // Confirmation is not aborted by reset or stop: the backend may already
    // have handed the box over
    fn spawn_confirm(&self, value: ScannedValue, entity: ValidatedEntity) {
        let session = self.session;
        let service = Arc::clone(&self.service);
        let inputs = self.inputs_tx.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(service.confirm(&value, &entity))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(failure)) => Err(FlowError::from(&failure)),
                Err(_) => Err(FlowError::new(
                    FlowErrorKind::Unknown,
                    "validation service panicked",
                )),
            };
            let _ = inputs.send(Input::ConfirmDone {
                session,
                value,
                result,
            });
        });
    }
}
