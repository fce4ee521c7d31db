//! Decode offload worker
//!
//! Decoding a camera frame is CPU-bound. With offload enabled the decode loop
//! sends each frame to a `DecodeWorker` task, which runs the decoder on the
//! blocking pool and answers on a per-request reply channel. The contract is
//! plain request/response messages, so the worker can be swapped for another
//! execution strategy without touching the loop.

use crate::scanner::decoder::{BarcodeDecoder, DecodeError};
use crate::scanner::error::{ScanError, ScannerResult};
use crate::scanner::types::{BarcodeFormat, DecodeOutcome, Frame};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Requests queued before `submit` waits for capacity
const QUEUE_DEPTH: usize = 4;

#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub id: u64,
    pub frame: Frame,
    pub formats: Vec<BarcodeFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResponse {
    pub id: u64,
    pub outcome: Result<DecodeOutcome, DecodeError>,
}

type Envelope = (DecodeRequest, oneshot::Sender<DecodeResponse>);

/// Handle to a running decode worker task
#[derive(Debug)]
pub struct DecodeWorker {
    sender: mpsc::Sender<Envelope>,
    next_id: AtomicU64,
    task: JoinHandle<()>,
}

impl DecodeWorker {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(decoder: Arc<dyn BarcodeDecoder>) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
        let task = tokio::spawn(run_worker(decoder, receiver));

        Self {
            sender,
            next_id: AtomicU64::new(1),
            task,
        }
    }

    /// Send a request and wait for its response
    pub async fn submit(&self, request: DecodeRequest) -> ScannerResult<DecodeResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send((request, reply_tx))
            .await
            .map_err(|_| ScanError::Internal {
                message: "decode worker has stopped".to_string(),
            })?;

        reply_rx.await.map_err(|_| ScanError::Internal {
            message: "decode worker dropped the request".to_string(),
        })
    }

    /// Decode one frame on the worker
    pub async fn decode(
        &self,
        frame: Frame,
        formats: Vec<BarcodeFormat>,
    ) -> ScannerResult<DecodeOutcome> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self.submit(DecodeRequest { id, frame, formats }).await?;

        if response.id != id {
            return Err(ScanError::Internal {
                message: format!(
                    "decode worker answered request {} with response {}",
                    id, response.id
                ),
            });
        }
        response.outcome.map_err(ScanError::from)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_worker(decoder: Arc<dyn BarcodeDecoder>, mut receiver: mpsc::Receiver<Envelope>) {
    log::debug!("Decode worker started");

    while let Some((request, reply)) = receiver.recv().await {
        let id = request.id;
        let decoder = Arc::clone(&decoder);
        let outcome = tokio::task::spawn_blocking(move || {
            decoder.decode(&request.frame, &request.formats)
        })
        .await
        .unwrap_or_else(|e| Err(DecodeError::Failed(format!("decoder panicked: {}", e))));

        if reply.send(DecodeResponse { id, outcome }).is_err() {
            log::trace!("Decode request {} abandoned by caller", id);
        }
    }

    log::debug!("Decode worker stopped");
}
