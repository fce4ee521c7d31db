//! Camera provider traits
//!
//! The platform camera stack (or a test double) sits behind these traits.
//! A stream is owned by the decode loop; its tracks are shared with the
//! engine so `ScannerEngine::stop` can release the camera without waiting
//! for the loop.

use crate::scanner::error::ScannerResult;
use crate::scanner::types::{
    CameraConstraints, DeviceInfo, Frame, TrackCapabilities, TrackConstraint,
};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Video inputs currently available
    async fn enumerate_devices(&self) -> ScannerResult<Vec<DeviceInfo>>;

    /// Open a stream; may prompt for permission
    async fn acquire(&self, constraints: &CameraConstraints) -> ScannerResult<Box<dyn MediaStream>>;
}

#[async_trait]
pub trait MediaStream: Send {
    fn device_id(&self) -> &str;

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    /// Next frame; `Ok(None)` when the stream has ended
    async fn next_frame(&mut self) -> ScannerResult<Option<Frame>>;
}

pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    /// Release the underlying device; stopping twice is a no-op
    fn stop(&self);

    fn is_live(&self) -> bool;

    fn capabilities(&self) -> TrackCapabilities;

    fn apply_constraint(&self, constraint: TrackConstraint) -> ScannerResult<()>;
}

/// Stop every live track, returning how many were stopped
pub fn stop_all_tracks(tracks: &[Arc<dyn MediaTrack>]) -> usize {
    let mut stopped = 0;
    for track in tracks.iter().filter(|track| track.is_live()) {
        log::trace!("Stopping track {}", track.id());
        track.stop();
        stopped += 1;
    }
    stopped
}
