//! Process signals.
//!
//! SIGINT and SIGTERM stop the daemon. SIGHUP forces a rebuild of the
//! content tree, for edits made while the watcher is off.

use brain_tree::Updater;
use std::fmt;
use tokio::sync::broadcast;

/// Why the daemon is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::Requested => "shutdown requested",
        })
    }
}

/// Wait for a shutdown signal, rebuilding the tree on every SIGHUP meanwhile.
pub async fn wait_for_shutdown(
    mut shutdown_rx: broadcast::Receiver<()>,
    updater: &Updater,
) -> ShutdownReason {
    // Registered once so no signal is lost while a SIGHUP is handled
    let mut terminations = Listener::terminate();
    let mut hangups = Listener::hangup();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => return ShutdownReason::Interrupt,
            _ = shutdown_rx.recv() => return ShutdownReason::Requested,
            _ = terminations.recv() => return ShutdownReason::Terminate,
            _ = hangups.recv() => {
                let ticket = updater.trigger();
                tracing::info!(ticket, "SIGHUP received, rebuilding content tree");
            }
        }
    }
}

/// Signal stream. Never yields where it cannot be registered.
struct Listener {
    #[cfg(unix)]
    inner: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl Listener {
    fn terminate() -> Self {
        Self::register(tokio::signal::unix::SignalKind::terminate(), "SIGTERM")
    }

    fn hangup() -> Self {
        Self::register(tokio::signal::unix::SignalKind::hangup(), "SIGHUP")
    }

    fn register(kind: tokio::signal::unix::SignalKind, name: &str) -> Self {
        let inner = match tokio::signal::unix::signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::warn!(error = %e, signal = name, "Failed to register signal handler");
                None
            }
        };
        Self { inner }
    }

    async fn recv(&mut self) {
        if let Some(stream) = self.inner.as_mut() {
            if stream.recv().await.is_some() {
                return;
            }
            self.inner = None;
        }
        std::future::pending::<()>().await;
    }
}

#[cfg(not(unix))]
impl Listener {
    fn terminate() -> Self {
        Self {}
    }

    fn hangup() -> Self {
        Self {}
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_tree::{Tree, TreeBuilder};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_requested_shutdown() {
        let temp_dir = tempdir().unwrap();
        let (tx, _) = broadcast::channel(1);
        let (updater, _handle) = Updater::spawn(
            Arc::new(Tree::new()),
            TreeBuilder::new(temp_dir.path()),
            tx.subscribe(),
        );

        let rx = tx.subscribe();
        tx.send(()).unwrap();

        assert_eq!(wait_for_shutdown(rx, &updater).await, ShutdownReason::Requested);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ShutdownReason::Terminate.to_string(), "SIGTERM");
    }
}
