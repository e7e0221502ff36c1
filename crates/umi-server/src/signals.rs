//! Unix signal handling for the server.
//!
//! - SIGTERM/SIGINT: graceful shutdown
//! - SIGHUP: reload the credential store from disk

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

/// Signal handler that manages Unix signal processing.
#[derive(Debug)]
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    /// Counts reload requests so that none is lost between two polls.
    reload_tx: Arc<watch::Sender<u64>>,
    reload_rx: watch::Receiver<u64>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    /// Creates a new signal handler.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (reload_tx, reload_rx) = watch::channel(0);

        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            reload_tx: Arc::new(reload_tx),
            reload_rx,
        }
    }

    /// Spawns the signal listener task.
    ///
    /// Call once at startup. If a handler cannot be installed the error is
    /// logged and the server keeps running without it.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();
        let reload_tx = self.reload_tx.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let installed = (|| {
                Ok::<_, std::io::Error>((
                    signal(SignalKind::terminate())?,
                    signal(SignalKind::interrupt())?,
                    signal(SignalKind::hangup())?,
                ))
            })();
            let (mut sigterm, mut sigint, mut sighup) = match installed {
                Ok(signals) => signals,
                Err(e) => {
                    error!(error = %e, "cannot install signal handlers");
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("received SIGTERM, shutting down");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sigint.recv() => {
                        info!("received SIGINT, shutting down");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sighup.recv() => {
                        info!("received SIGHUP, reloading credential store");
                        reload_tx.send_modify(|n| *n += 1);
                    }
                }
            }

            debug!("signal listener stopped");
        });
    }

    /// Non-Unix implementation: Ctrl+C only.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("received Ctrl+C, shutting down");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    /// Returns a future that completes when a shutdown signal is received.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }

    /// Returns a stream of reload requests.
    pub fn reload(&self) -> ReloadSignal {
        let mut rx = self.reload_rx.clone();
        rx.mark_unchanged();
        ReloadSignal { rx }
    }

    /// Returns true if shutdown has been signaled.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Programmatically triggers a shutdown.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Programmatically requests a reload.
    pub fn trigger_reload(&self) {
        self.reload_tx.send_modify(|n| *n += 1);
    }

    /// Creates a shutdown handle that can be passed to other components.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
            rx: self.shutdown_rx.clone(),
        }
    }
}

/// A signal that completes when shutdown is signaled.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the shutdown signal.
    pub async fn wait(mut self) {
        // An error means every sender is gone; treat it as shutdown too.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Reload requests, observed one batch at a time.
#[derive(Debug)]
pub struct ReloadSignal {
    rx: watch::Receiver<u64>,
}

impl ReloadSignal {
    /// Waits for the next reload request.
    ///
    /// Returns `false` once the handler is gone.
    pub async fn next(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// A handle for triggering or checking shutdown status.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    /// Triggers a shutdown.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns true if shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Returns a future that completes when shutdown is triggered.
    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_handler_shutdown() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown());

        handler.trigger_shutdown();

        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn shutdown_signal_wait() {
        let handler = SignalHandler::new();
        let shutdown = handler.shutdown();

        let tx = handler.shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });

        let result = tokio::time::timeout(Duration::from_millis(100), shutdown.wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn reloads_are_counted() {
        let handler = SignalHandler::new();
        let mut reload = handler.reload();

        handler.trigger_reload();
        handler.trigger_reload();
        assert!(reload.next().await);

        let pending = tokio::time::timeout(Duration::from_millis(20), reload.next()).await;
        assert!(pending.is_err(), "both requests collapse into one wake-up");

        handler.trigger_reload();
        assert!(reload.next().await);
    }

    #[tokio::test]
    async fn shutdown_handle() {
        let handler = SignalHandler::new();
        let handle = handler.shutdown_handle();
        assert!(!handle.is_shutdown());

        handle.trigger();

        assert!(handle.is_shutdown());
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn shutdown_handle_wait() {
        let handler = SignalHandler::new();
        let handle = handler.shutdown_handle();

        let wait_handle = handle.clone();
        let wait_task = tokio::spawn(async move {
            wait_handle.wait().wait().await;
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();

        let result = tokio::time::timeout(Duration::from_millis(100), wait_task).await;
        assert!(result.unwrap().unwrap());
    }
}
