//! Scanner Component
//!
//! Binds a continuous barcode decode loop to a camera stream. One
//! `ScannerEngine` serves both the totem (PDF417/QR identity cards) and the
//! guard station (ticket QR codes); `ScannerConfig` selects symbologies,
//! pacing and whether decoding is offloaded to a `DecodeWorker`.
//!
//! ## Core Features
//!
//! - **ScannerEngine**: start/stop with at most one live stream, stop is synchronous
//! - **Device selection**: rear-facing preference and a remembered last device
//! - **DecodeWorker**: request/response decode offload to the blocking pool
//! - **ScanDeduplicator**: time-windowed suppression of repeated reads
//! - **Keyboard wedge**: hardware scanners typing payloads exposed as a camera

pub mod api;
pub mod camera;
pub mod decoder;
pub mod dedup;
pub mod devices;
pub mod engine;
pub mod error;
pub mod types;
pub mod wedge;
pub mod worker;

#[cfg(test)]
pub(crate) mod tests;
