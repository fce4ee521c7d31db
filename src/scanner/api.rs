//! Scanner API
//!
//! Public API for the scanner system, consolidating external exports the same
//! way `identity::api` and `store::api` do.

// Engine and callbacks
pub use crate::scanner::engine::{ScanHandler, ScannerEngine};

// External collaborators
pub use crate::scanner::camera::{stop_all_tracks, CameraProvider, MediaStream, MediaTrack};
pub use crate::scanner::decoder::{BarcodeDecoder, DecodeError};

// Decode offload
pub use crate::scanner::worker::{DecodeRequest, DecodeResponse, DecodeWorker};

// Supporting components
pub use crate::scanner::dedup::{ScanDeduplicator, DEFAULT_DEDUP_WINDOW};
pub use crate::scanner::devices::{looks_rear_facing, DeviceSelector};
pub use crate::scanner::wedge::{WedgeCamera, WedgeDecoder, WEDGE_DEVICE_ID};

// Error handling
pub use crate::scanner::error::{ScanError, ScannerResult};

// Core data types and structures
pub use crate::scanner::types::{
    BarcodeFormat, CameraConstraints, DecodeOutcome, DeviceInfo, Facing, Frame, ScanResult,
    ScannerConfig, TrackCapabilities, TrackConstraint,
};
