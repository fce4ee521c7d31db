//! Keyboard-wedge scanners
//!
//! Handheld scanners in keyboard mode decode the barcode themselves and
//! "type" the payload followed by Enter. `WedgeCamera` exposes such an input
//! (stdin, a serial adapter, a test pipe) as a one-device camera whose frames
//! carry the typed line, and `WedgeDecoder` turns those frames back into text.
//!
//! Lines are shared between streams, so a restarted session keeps reading
//! where the previous one stopped.

use crate::scanner::camera::{CameraProvider, MediaStream, MediaTrack};
use crate::scanner::decoder::{BarcodeDecoder, DecodeError};
use crate::scanner::error::{ScanError, ScannerResult};
use crate::scanner::types::{
    BarcodeFormat, CameraConstraints, DecodeOutcome, DeviceInfo, Facing, Frame,
    TrackCapabilities, TrackConstraint,
};
use async_trait::async_trait;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::Mutex;

pub const WEDGE_DEVICE_ID: &str = "keyboard-wedge";

static UUID_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});

type SharedLines = Arc<Mutex<Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>>>;

/// Line-oriented input presented as a camera
#[derive(Clone)]
pub struct WedgeCamera {
    lines: SharedLines,
    label: String,
}

impl WedgeCamera {
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        let boxed: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(boxed).lines())),
            label: "Keyboard wedge scanner".to_string(),
        }
    }

    /// Scanner typing into this process's standard input
    pub fn stdin() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    fn device(&self) -> DeviceInfo {
        DeviceInfo {
            id: WEDGE_DEVICE_ID.to_string(),
            label: self.label.clone(),
            facing: Facing::Unknown,
        }
    }
}

#[async_trait]
impl CameraProvider for WedgeCamera {
    async fn enumerate_devices(&self) -> ScannerResult<Vec<DeviceInfo>> {
        Ok(vec![self.device()])
    }

    async fn acquire(&self, constraints: &CameraConstraints) -> ScannerResult<Box<dyn MediaStream>> {
        if let Some(requested) = &constraints.device_id {
            if requested != WEDGE_DEVICE_ID {
                return Err(ScanError::Acquisition {
                    message: format!("unknown device '{}'", requested),
                });
            }
        }

        Ok(Box::new(WedgeStream {
            lines: Arc::clone(&self.lines),
            track: Arc::new(WedgeTrack::default()),
        }))
    }
}

pub struct WedgeStream {
    lines: SharedLines,
    track: Arc<WedgeTrack>,
}

#[async_trait]
impl MediaStream for WedgeStream {
    fn device_id(&self) -> &str {
        WEDGE_DEVICE_ID
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![self.track.clone() as Arc<dyn MediaTrack>]
    }

    async fn next_frame(&mut self) -> ScannerResult<Option<Frame>> {
        let mut lines = self.lines.lock().await;
        loop {
            if !self.track.is_live() {
                return Ok(None);
            }

            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim_end_matches('\r');
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Ok(Some(Frame::from_bytes(line.as_bytes())));
                }
                Ok(None) => return Ok(None),
                Err(e) => {
                    return Err(ScanError::Acquisition {
                        message: format!("reading scanner input: {}", e),
                    })
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct WedgeTrack {
    live: AtomicBool,
}

impl Default for WedgeTrack {
    fn default() -> Self {
        Self {
            live: AtomicBool::new(true),
        }
    }
}

impl MediaTrack for WedgeTrack {
    fn id(&self) -> &str {
        WEDGE_DEVICE_ID
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> TrackCapabilities {
        TrackCapabilities::default()
    }

    fn apply_constraint(&self, constraint: TrackConstraint) -> ScannerResult<()> {
        Err(ScanError::Constraint {
            message: format!("keyboard wedge does not support {:?}", constraint),
        })
    }
}

/// Yields the typed line as the decoded text
///
/// The scanner has already decoded the symbol, so the format is inferred:
/// URLs and bare UUIDs come from QR codes, anything else from PDF417.
#[derive(Debug, Clone, Copy, Default)]
pub struct WedgeDecoder;

impl WedgeDecoder {
    fn infer_format(text: &str) -> BarcodeFormat {
        let lower = text.to_ascii_lowercase();
        if lower.starts_with("http://")
            || lower.starts_with("https://")
            || UUID_LIKE.is_match(text)
            || text.starts_with('{')
        {
            BarcodeFormat::QrCode
        } else {
            BarcodeFormat::Pdf417
        }
    }
}

impl BarcodeDecoder for WedgeDecoder {
    fn decode(
        &self,
        frame: &Frame,
        formats: &[BarcodeFormat],
    ) -> Result<DecodeOutcome, DecodeError> {
        let text = std::str::from_utf8(&frame.data).map_err(|e| DecodeError::UnsupportedFrame {
            width: frame.width,
            height: frame.height,
            reason: format!("input is not UTF-8: {}", e),
        })?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(DecodeOutcome::NotFound);
        }

        let format = Self::infer_format(text);
        if !formats.contains(&format) {
            log::trace!("Ignoring {} input outside configured formats", format);
            return Ok(DecodeOutcome::NotFound);
        }

        Ok(DecodeOutcome::Found {
            text: text.to_string(),
            format,
        })
    }
}
