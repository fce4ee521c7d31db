//! Scanner engine
//!
//! Owns at most one scan session: an acquired camera stream plus the decode
//! loop task reading it. Results and errors are pushed to a `ScanHandler`.
//! `stop()` is synchronous: it signals the loop, aborts the task and stops
//! every track before returning, so the camera indicator turns off
//! immediately and no result is delivered after it returns.
//!
//! Every `stop()` bumps a generation counter. A `start()` still waiting on
//! the camera compares it before installing its session and releases the
//! stream instead when a stop got in first.

use crate::scanner::camera::{stop_all_tracks, CameraProvider, MediaStream, MediaTrack};
use crate::scanner::decoder::BarcodeDecoder;
use crate::scanner::devices::DeviceSelector;
use crate::scanner::error::{ScanError, ScannerResult};
use crate::scanner::types::{
    BarcodeFormat, CameraConstraints, DecodeOutcome, DeviceInfo, Frame, ScanResult,
    ScannerConfig, TrackConstraint,
};
use crate::scanner::worker::DecodeWorker;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Receives decode loop output
///
/// Called from the loop task; implementations should hand work off quickly
/// (the scan flow forwards into its event channel).
pub trait ScanHandler: Send + Sync {
    fn on_result(&self, result: ScanResult);

    /// Decode errors are non-fatal; camera failures end the session
    fn on_error(&self, error: ScanError);
}

struct ScanSession {
    device_id: String,
    tracks: Vec<Arc<dyn MediaTrack>>,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ScanSession {
    fn teardown(self) -> usize {
        // Cancel first so a decode finishing right now is discarded
        let _ = self.cancel.send(true);
        self.task.abort();
        stop_all_tracks(&self.tracks)
    }
}

pub struct ScannerEngine {
    camera: Arc<dyn CameraProvider>,
    decoder: Arc<dyn BarcodeDecoder>,
    handler: Arc<dyn ScanHandler>,
    config: ScannerConfig,
    devices: DeviceSelector,
    worker: Mutex<Option<Arc<DecodeWorker>>>,
    session: Mutex<Option<ScanSession>>,
    start_lock: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

impl ScannerEngine {
    pub fn new(
        camera: Arc<dyn CameraProvider>,
        decoder: Arc<dyn BarcodeDecoder>,
        handler: Arc<dyn ScanHandler>,
        config: ScannerConfig,
        devices: DeviceSelector,
    ) -> Self {
        Self {
            camera,
            decoder,
            handler,
            config,
            devices,
            worker: Mutex::new(None),
            session: Mutex::new(None),
            start_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Open the camera and start decoding, returning the device id in use
    ///
    /// A session already running is torn down first. Without an explicit
    /// device the remembered one is used, else a rear-facing one.
    ///
    /// Fails with `ScanError::Cancelled`, leaving the camera released, when
    /// `stop()` is called before the stream is up.
    pub async fn start(&self, device_id: Option<&str>) -> ScannerResult<String> {
        let _starting = self.start_lock.lock().await;
        self.stop();
        let generation = self.generation.load(Ordering::SeqCst);

        let devices = self.camera.enumerate_devices().await?;
        let chosen = self
            .devices
            .choose(&devices, device_id, self.config.preferred_facing);
        let constraints = CameraConstraints {
            device_id: chosen,
            facing: Some(self.config.preferred_facing),
        };

        let stream = self.camera.acquire(&constraints).await?;
        let active_device = stream.device_id().to_string();
        let tracks = stream.tracks();
        if self.generation.load(Ordering::SeqCst) != generation {
            let stopped = stop_all_tracks(&tracks);
            log::debug!(
                "Start on '{}' cancelled by stop ({} tracks released)",
                active_device,
                stopped
            );
            return Err(ScanError::Cancelled);
        }
        self.devices.remember(&active_device);

        let worker = if self.config.offload_decoding {
            match self.worker() {
                Ok(worker) => Some(worker),
                Err(e) => {
                    stop_all_tracks(&tracks);
                    return Err(e);
                }
            }
        } else {
            None
        };

        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(decode_loop(DecodeLoop {
            stream,
            decoder: Arc::clone(&self.decoder),
            worker,
            handler: Arc::clone(&self.handler),
            formats: self.config.formats.clone(),
            frame_interval: self.config.frame_interval,
            device_id: active_device.clone(),
            cancelled,
        }));

        let session = ScanSession {
            device_id: active_device.clone(),
            tracks,
            cancel,
            task,
        };
        let mut guard = self.session_guard();
        if self.generation.load(Ordering::SeqCst) != generation {
            drop(guard);
            session.teardown();
            log::debug!("Start on '{}' cancelled by stop", active_device);
            return Err(ScanError::Cancelled);
        }
        let replaced = guard.replace(session);
        drop(guard);
        if let Some(stale) = replaced {
            stale.teardown();
        }

        log::debug!(
            "Scanner started on '{}' ({} formats, offload {})",
            active_device,
            self.config.formats.len(),
            self.config.offload_decoding
        );
        Ok(active_device)
    }

    /// Stop decoding and release the camera
    ///
    /// Also cancels a `start()` that has not installed its session yet.
    pub fn stop(&self) {
        let session = {
            let mut guard = self.session_guard();
            self.generation.fetch_add(1, Ordering::SeqCst);
            guard.take()
        };
        if let Some(session) = session {
            let device_id = session.device_id.clone();
            let stopped = session.teardown();
            log::debug!(
                "Scanner stopped on '{}' ({} tracks released)",
                device_id,
                stopped
            );
        }
    }

    /// True while a session exists and its loop is still running
    pub fn is_active(&self) -> bool {
        self.session_guard()
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }

    pub fn current_device(&self) -> Option<String> {
        self.session_guard()
            .as_ref()
            .map(|session| session.device_id.clone())
    }

    pub async fn list_devices(&self) -> ScannerResult<Vec<DeviceInfo>> {
        self.camera.enumerate_devices().await
    }

    pub fn devices(&self) -> &DeviceSelector {
        &self.devices
    }

    /// Switch the torch on the first track that supports it
    ///
    /// Returns `Ok(false)` when not scanning or no track has a torch.
    pub fn set_torch(&self, on: bool) -> ScannerResult<bool> {
        let guard = self.session_guard();
        let Some(session) = guard.as_ref() else {
            return Ok(false);
        };

        match session
            .tracks
            .iter()
            .find(|track| track.is_live() && track.capabilities().torch)
        {
            Some(track) => {
                track.apply_constraint(TrackConstraint::Torch(on))?;
                log::debug!("Torch {} on track {}", if on { "on" } else { "off" }, track.id());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Teardown must work even after a panic elsewhere poisoned the lock
    fn session_guard(&self) -> MutexGuard<'_, Option<ScanSession>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn worker(&self) -> ScannerResult<Arc<DecodeWorker>> {
        let mut guard = crate::core::sync::handle_mutex_poison(self.worker.lock(), |message| {
            ScanError::Internal { message }
        })?;

        match guard.as_ref() {
            Some(worker) if worker.is_running() => Ok(Arc::clone(worker)),
            _ => {
                let worker = Arc::new(DecodeWorker::spawn(Arc::clone(&self.decoder)));
                *guard = Some(Arc::clone(&worker));
                Ok(worker)
            }
        }
    }
}

impl Drop for ScannerEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct DecodeLoop {
    stream: Box<dyn MediaStream>,
    decoder: Arc<dyn BarcodeDecoder>,
    worker: Option<Arc<DecodeWorker>>,
    handler: Arc<dyn ScanHandler>,
    formats: Vec<BarcodeFormat>,
    frame_interval: Duration,
    device_id: String,
    cancelled: watch::Receiver<bool>,
}

impl DecodeLoop {
    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

// Borrows fields separately: the stream is not Sync, so the loop state as a
// whole must not be held across an await
async fn decode_frame(
    decoder: &Arc<dyn BarcodeDecoder>,
    worker: Option<&Arc<DecodeWorker>>,
    formats: &[BarcodeFormat],
    frame: Frame,
) -> ScannerResult<DecodeOutcome> {
    match worker {
        Some(worker) => worker.decode(frame, formats.to_vec()).await,
        None => decoder.decode(&frame, formats).map_err(ScanError::from),
    }
}

async fn decode_loop(mut ctx: DecodeLoop) {
    loop {
        let next = tokio::select! {
            _ = ctx.cancelled.changed() => break,
            next = ctx.stream.next_frame() => next,
        };

        let frame = match next {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                if !ctx.is_cancelled() {
                    log::warn!("Camera stream '{}' ended", ctx.device_id);
                    ctx.handler.on_error(ScanError::StreamEnded {
                        device_id: ctx.device_id.clone(),
                    });
                }
                break;
            }
            Err(e) => {
                if !ctx.is_cancelled() {
                    log::warn!("Camera failure on '{}': {}", ctx.device_id, e);
                    ctx.handler.on_error(e);
                }
                break;
            }
        };

        let outcome =
            decode_frame(&ctx.decoder, ctx.worker.as_ref(), &ctx.formats, frame).await;
        if ctx.is_cancelled() {
            break;
        }

        match outcome {
            Ok(DecodeOutcome::Found { text, format }) => {
                log::trace!("Decoded {} ({} bytes)", format, text.len());
                ctx.handler.on_result(ScanResult {
                    text,
                    format,
                    timestamp: SystemTime::now(),
                });
            }
            Ok(DecodeOutcome::NotFound) => {}
            Err(e) if e.is_camera_failure() => {
                ctx.handler.on_error(e);
                break;
            }
            Err(e) => {
                log::debug!("Decode error (continuing): {}", e);
                ctx.handler.on_error(e);
            }
        }

        if !ctx.frame_interval.is_zero() {
            tokio::select! {
                _ = ctx.cancelled.changed() => break,
                _ = tokio::time::sleep(ctx.frame_interval) => {}
            }
        }
    }

    log::trace!("Decode loop for '{}' finished", ctx.device_id);
}
