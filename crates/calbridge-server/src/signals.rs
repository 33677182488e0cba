//! Shutdown signal handling.
//!
//! SIGTERM and SIGINT (Ctrl+C elsewhere) stop the listener; requests already
//! in flight are allowed to finish.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Listens for process signals and fans shutdown out to waiters.
pub struct SignalHandler {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Spawns the signal listener task. Call once at startup.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let tx = self.tx.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!(error = %e, "Failed to install signal handlers");
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            }
            let _ = tx.send(true);
            debug!("Signal listener stopped");
        });
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let tx = self.tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received Ctrl+C, shutting down");
                let _ = tx.send(true);
            }
        });
    }

    /// Future that completes once shutdown is requested.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }

    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

/// Completes when shutdown is signaled.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // A dropped sender also ends the wait.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Triggers shutdown without a process signal.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }
}
