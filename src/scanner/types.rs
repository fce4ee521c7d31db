//! Scanner Types and Enums
//!
//! Shared types and enums used throughout the scanner module.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Barcode symbologies the decode loop can be restricted to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BarcodeFormat {
    /// Matrix code on newer ID cards and on guard tickets
    QrCode,
    /// Stacked linear code on the back of older ID cards
    Pdf417,
    Code128,
    Code39,
}

/// One decoded barcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub text: String,
    pub format: BarcodeFormat,
    pub timestamp: SystemTime,
}

/// A captured frame
///
/// Pixel data is shared so frames can be handed to the decode worker without
/// copying.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            captured_at: Instant::now(),
        }
    }

    /// Single-row frame carrying raw bytes (keyboard wedge input)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes.len() as u32, 1, bytes)
    }
}

/// Result of decoding one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Found { text: String, format: BarcodeFormat },
    /// No code visible in this frame; never reported
    NotFound,
}

/// Which way a camera points
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Facing {
    Front,
    Rear,
    #[default]
    Unknown,
}

/// A video input as reported by the camera provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
    pub facing: Facing,
}

/// What to ask the camera provider for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraConstraints {
    /// Exact device; `None` lets the provider pick by `facing`
    pub device_id: Option<String>,
    pub facing: Option<Facing>,
}

/// Optional features a video track advertises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackCapabilities {
    pub torch: bool,
}

/// Constraint applied to a live track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackConstraint {
    Torch(bool),
}

/// Scanner engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Symbologies handed to the decoder
    pub formats: Vec<BarcodeFormat>,
    /// Decode on the `DecodeWorker` instead of inside the loop task
    pub offload_decoding: bool,
    /// Pause between frames; zero decodes as fast as frames arrive
    pub frame_interval: Duration,
    /// Facing preferred when no device was chosen explicitly
    pub preferred_facing: Facing,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            formats: vec![BarcodeFormat::Pdf417, BarcodeFormat::QrCode],
            offload_decoding: false,
            frame_interval: Duration::ZERO,
            preferred_facing: Facing::Rear,
        }
    }
}

impl ScannerConfig {
    /// Configuration for guard-station ticket scanning (QR only)
    pub fn tickets() -> Self {
        Self {
            formats: vec![BarcodeFormat::QrCode],
            ..Self::default()
        }
    }
}
