//! Test helpers for scanner unit tests
//!
//! Scripted doubles for the camera and decoder so engine tests control
//! exactly which frames arrive and when. These are separate from the
//! integration helpers in tests/common/, which drive the real wedge camera.

use crate::scanner::camera::{CameraProvider, MediaStream, MediaTrack};
use crate::scanner::decoder::{BarcodeDecoder, DecodeError};
use crate::scanner::engine::{ScanHandler, ScannerEngine};
use crate::scanner::devices::DeviceSelector;
use crate::scanner::error::{ScanError, ScannerResult};
use crate::scanner::types::{
    BarcodeFormat, CameraConstraints, DecodeOutcome, DeviceInfo, Facing, Frame, ScanResult,
    ScannerConfig, TrackCapabilities, TrackConstraint,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Decoder payloads with special meaning for `ScriptedDecoder`
pub const NO_CODE: &str = "NOCODE";
pub const CORRUPT: &str = "CORRUPT";

/// One step a scripted stream will play
#[derive(Debug)]
pub enum Step {
    Text(String),
    Fail(ScanError),
    End,
}

pub struct ScriptedTrack {
    id: String,
    live: AtomicBool,
    torch_capable: bool,
    torch: AtomicBool,
}

impl ScriptedTrack {
    pub fn torch_on(&self) -> bool {
        self.torch.load(Ordering::SeqCst)
    }
}

impl MediaTrack for ScriptedTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> TrackCapabilities {
        TrackCapabilities {
            torch: self.torch_capable,
        }
    }

    fn apply_constraint(&self, constraint: TrackConstraint) -> ScannerResult<()> {
        match constraint {
            TrackConstraint::Torch(on) if self.torch_capable => {
                self.torch.store(on, Ordering::SeqCst);
                Ok(())
            }
            TrackConstraint::Torch(_) => Err(ScanError::Constraint {
                message: "no torch".to_string(),
            }),
        }
    }
}

/// Camera whose frames are pushed by the test
pub struct ScriptedCamera {
    devices: Vec<DeviceInfo>,
    torch_capable: bool,
    steps_tx: mpsc::UnboundedSender<Step>,
    steps_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Step>>>,
    acquire_failure: Mutex<Option<ScanError>>,
    acquire_delay: Mutex<Option<Duration>>,
    pub acquired: Mutex<Vec<CameraConstraints>>,
    pub tracks: Mutex<Vec<Arc<ScriptedTrack>>>,
}

impl ScriptedCamera {
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        let (steps_tx, steps_rx) = mpsc::unbounded_channel();
        Self {
            devices,
            torch_capable: false,
            steps_tx,
            steps_rx: Arc::new(tokio::sync::Mutex::new(steps_rx)),
            acquire_failure: Mutex::new(None),
            acquire_delay: Mutex::new(None),
            acquired: Mutex::new(Vec::new()),
            tracks: Mutex::new(Vec::new()),
        }
    }

    /// Front webcam plus a rear camera recognisable only by its label
    pub fn with_two_devices() -> Self {
        Self::new(vec![
            device("front-cam", "Integrated Webcam"),
            device("rear-cam", "Back Camera"),
        ])
    }

    pub fn with_torch(mut self) -> Self {
        self.torch_capable = true;
        self
    }

    pub fn fail_next_acquire(&self, error: ScanError) {
        *self.acquire_failure.lock().unwrap() = Some(error);
    }

    /// Make the next `acquire` take `delay` before the stream is up
    pub fn delay_next_acquire(&self, delay: Duration) {
        *self.acquire_delay.lock().unwrap() = Some(delay);
    }

    pub fn push(&self, step: Step) {
        self.steps_tx.send(step).unwrap();
    }

    pub fn push_text(&self, text: &str) {
        self.push(Step::Text(text.to_string()));
    }

    pub fn acquire_count(&self) -> usize {
        self.acquired.lock().unwrap().len()
    }

    pub fn track(&self, index: usize) -> Arc<ScriptedTrack> {
        Arc::clone(&self.tracks.lock().unwrap()[index])
    }

    pub fn live_tracks(&self) -> usize {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_live())
            .count()
    }
}

pub fn device(id: &str, label: &str) -> DeviceInfo {
    DeviceInfo {
        id: id.to_string(),
        label: label.to_string(),
        facing: Facing::Unknown,
    }
}

#[async_trait]
impl CameraProvider for ScriptedCamera {
    async fn enumerate_devices(&self) -> ScannerResult<Vec<DeviceInfo>> {
        Ok(self.devices.clone())
    }

    async fn acquire(&self, constraints: &CameraConstraints) -> ScannerResult<Box<dyn MediaStream>> {
        let delay = self.acquire_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.acquire_failure.lock().unwrap().take() {
            return Err(error);
        }

        let mut acquired = self.acquired.lock().unwrap();
        acquired.push(constraints.clone());
        let device_id = constraints
            .device_id
            .clone()
            .unwrap_or_else(|| "default".to_string());

        let track = Arc::new(ScriptedTrack {
            id: format!("{}#{}", device_id, acquired.len()),
            live: AtomicBool::new(true),
            torch_capable: self.torch_capable,
            torch: AtomicBool::new(false),
        });
        self.tracks.lock().unwrap().push(Arc::clone(&track));

        Ok(Box::new(ScriptedStream {
            device_id,
            track,
            steps: Arc::clone(&self.steps_rx),
        }))
    }
}

struct ScriptedStream {
    device_id: String,
    track: Arc<ScriptedTrack>,
    steps: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Step>>>,
}

#[async_trait]
impl MediaStream for ScriptedStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![self.track.clone() as Arc<dyn MediaTrack>]
    }

    async fn next_frame(&mut self) -> ScannerResult<Option<Frame>> {
        let step = self.steps.lock().await.recv().await;
        match step {
            Some(Step::Text(text)) => Ok(Some(Frame::from_bytes(text.as_bytes()))),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::End) | None => Ok(None),
        }
    }
}

/// Frame bytes are the decoded text; see `NO_CODE` and `CORRUPT`
pub struct ScriptedDecoder;

impl BarcodeDecoder for ScriptedDecoder {
    fn decode(
        &self,
        frame: &Frame,
        formats: &[BarcodeFormat],
    ) -> Result<DecodeOutcome, DecodeError> {
        let text = String::from_utf8_lossy(&frame.data).into_owned();
        match text.as_str() {
            NO_CODE => Ok(DecodeOutcome::NotFound),
            CORRUPT => Err(DecodeError::Failed("checksum error in symbol".to_string())),
            _ => Ok(DecodeOutcome::Found {
                text,
                format: formats.first().copied().unwrap_or(BarcodeFormat::QrCode),
            }),
        }
    }
}

/// Records everything the engine reports
#[derive(Default)]
pub struct RecordingHandler {
    pub results: Mutex<Vec<ScanResult>>,
    pub errors: Mutex<Vec<ScanError>>,
}

impl ScanHandler for RecordingHandler {
    fn on_result(&self, result: ScanResult) {
        self.results.lock().unwrap().push(result);
    }

    fn on_error(&self, error: ScanError) {
        self.errors.lock().unwrap().push(error);
    }
}

impl RecordingHandler {
    pub fn texts(&self) -> Vec<String> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

/// Poll `condition` until it holds, panicking after two seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Engine wired to a scripted camera, decoder and recording handler
pub fn scripted_engine(
    camera: Arc<ScriptedCamera>,
    config: ScannerConfig,
    devices: DeviceSelector,
) -> (ScannerEngine, Arc<RecordingHandler>) {
    let handler = Arc::new(RecordingHandler::default());
    let engine = ScannerEngine::new(
        camera,
        Arc::new(ScriptedDecoder),
        handler.clone(),
        config,
        devices,
    );
    (engine, handler)
}
