//! Barcode decoder trait

use crate::scanner::types::{BarcodeFormat, DecodeOutcome, Frame};
use thiserror::Error;

/// Decode failures other than "no code in this frame"
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported frame ({width}x{height}): {reason}")]
    UnsupportedFrame {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("decoder failed: {0}")]
    Failed(String),
}

/// Synchronous, CPU-bound decoder
///
/// Only symbologies listed in `formats` may be reported.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, frame: &Frame, formats: &[BarcodeFormat])
        -> Result<DecodeOutcome, DecodeError>;
}
