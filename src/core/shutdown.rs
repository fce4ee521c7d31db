//! Shutdown coordination
//!
//! Turns process signals into a broadcast that long-running commands (the
//! interactive scan loop) select on, so the camera is released before exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Fans a stop request out to every subscriber
#[derive(Clone)]
pub struct ShutdownCoordinator {
    notify: broadcast::Sender<()>,
    requested: Arc<AtomicBool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(4);
        Self {
            notify,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    pub fn trigger_shutdown(&self) {
        self.requested.store(true, Ordering::Release);
        // No subscribers is fine: nothing is waiting yet
        let _ = self.notify.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Trigger on SIGINT, SIGTERM or SIGHUP (Ctrl-C off unix)
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_signal_handlers(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            // Default SIGPIPE so `totemscan extract | head` exits quietly
            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            }

            for kind in [
                SignalKind::interrupt(),
                SignalKind::terminate(),
                SignalKind::hangup(),
            ] {
                let coordinator = self.clone();
                tokio::spawn(async move {
                    let Ok(mut stream) = signal(kind) else {
                        log::warn!("Cannot listen for signal {:?}", kind);
                        return;
                    };
                    if stream.recv().await.is_some() {
                        log::info!("Signal {:?} received, releasing the scanner", kind);
                        coordinator.trigger_shutdown();
                    }
                });
            }
        }

        #[cfg(not(unix))]
        {
            let coordinator = self.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Ctrl-C received, releasing the scanner");
                    coordinator.trigger_shutdown();
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_notifies_subscribers() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx = coordinator.subscribe();

        assert!(!coordinator.is_shutdown_requested());
        coordinator.trigger_shutdown();

        assert!(rx.recv().await.is_ok());
        assert!(coordinator.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_clones_share_the_request() {
        let coordinator = ShutdownCoordinator::default();
        let handle = coordinator.clone();
        let mut rx = handle.subscribe();

        coordinator.trigger_shutdown();
        assert!(handle.is_shutdown_requested());
        assert!(rx.recv().await.is_ok());
    }
}
