//! Daemon lifecycle management.

use anyhow::{Context, Result};
use brain_core::BrainConfig;
use brain_ipc::{IpcServer, LoggingMiddleware, ServerOptions, SessionHandler};
use brain_tree::{ContentWatcher, Tree, TreeBuilder, Updater, WatcherOptions};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::handler::BrainHandler;
use crate::signals;

/// The main daemon process
pub struct Daemon {
    config: BrainConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new(config: BrainConfig) -> Result<Self> {
        config
            .ensure_dirs()
            .with_context(|| format!("Failed to create {}", config.content_dir.display()))?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            shutdown_tx,
        })
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Sender that stops a running daemon when signalled
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the daemon until a shutdown signal, or until the rebuild worker
    /// fails.
    pub async fn run(&self) -> Result<()> {
        self.acquire_pid_lock()?;

        tracing::info!(
            socket = %self.config.socket_path.display(),
            content_dir = %self.config.content_dir.display(),
            "Daemon starting"
        );

        let result = self.serve().await;
        self.cleanup();
        result
    }

    async fn serve(&self) -> Result<()> {
        // Subscribe everything before any shutdown can be sent
        let server_shutdown = self.shutdown_tx.subscribe();
        let signal_shutdown = self.shutdown_tx.subscribe();
        let worker_shutdown = self.shutdown_tx.subscribe();

        let builder = TreeBuilder::new(&self.config.content_dir);
        let initial = builder.clone();
        let tree = tokio::task::spawn_blocking(move || Tree::load(&initial))
            .await
            .context("Initial build panicked")?
            .context("Failed to build content tree")?;
        let tree = Arc::new(tree);

        tracing::info!(
            documents = tree.list_leaf_paths().len(),
            "Content tree loaded"
        );

        let (updater, mut worker) = Updater::spawn(tree.clone(), builder, worker_shutdown);

        let _watcher = if self.config.watch {
            let options = WatcherOptions {
                debounce_duration: self.config.watch_debounce(),
            };
            Some(
                ContentWatcher::start(&self.config.content_dir, options, updater.clone())
                    .context("Failed to watch content directory")?,
            )
        } else {
            None
        };

        let chain: Vec<Arc<dyn SessionHandler>> = vec![
            Arc::new(BrainHandler::new(
                &self.config.content_dir,
                tree,
                updater.clone(),
            )),
            Arc::new(LoggingMiddleware),
        ];

        let options = ServerOptions {
            timeout: self.config.session_timeout(),
            max_input_bytes: self.config.max_input_bytes,
        };
        let server = IpcServer::new(&self.config.socket_path, chain, options)
            .await
            .context("Failed to create session server")?;

        let serving = server.run(server_shutdown);
        tokio::pin!(serving);

        let outcome = tokio::select! {
            result = &mut serving => {
                return result.context("Session server failed");
            }
            reason = signals::wait_for_shutdown(signal_shutdown, &updater) => {
                tracing::info!(%reason, "Shutting down");
                Ok(())
            }
            joined = &mut worker => match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("Rebuild worker failed")),
                Err(e) => Err(anyhow::Error::new(e).context("Rebuild worker panicked")),
            },
        };

        // Stop accepting and let in-flight sessions finish
        let _ = self.shutdown_tx.send(());
        if let Err(e) = serving.await {
            tracing::error!("Session server error: {}", e);
        }

        outcome
    }

    /// Acquire PID lock to ensure single instance
    fn acquire_pid_lock(&self) -> Result<()> {
        let pid_file = &self.config.pid_file;

        if pid_file.exists() {
            if let Ok(pid_str) = std::fs::read_to_string(pid_file) {
                if let Ok(pid) = pid_str.trim().parse::<u32>() {
                    if is_process_running(pid) {
                        anyhow::bail!("Daemon already running (PID: {})", pid);
                    }
                }
            }
            // Stale PID file
            std::fs::remove_file(pid_file).context("Failed to remove stale PID file")?;
        }

        if let Some(dir) = pid_file.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(pid_file, std::process::id().to_string())
            .with_context(|| format!("Failed to write {}", pid_file.display()))?;

        tracing::debug!(pid = std::process::id(), "PID lock acquired");

        Ok(())
    }

    fn cleanup(&self) {
        tracing::info!("Cleaning up...");

        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
        if self.config.pid_file.exists() {
            let _ = std::fs::remove_file(&self.config.pid_file);
        }

        tracing::info!("Cleanup complete");
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if self.config.pid_file.exists() {
            if let Ok(pid) = std::fs::read_to_string(&self.config.pid_file) {
                if pid.trim() == std::process::id().to_string() {
                    let _ = std::fs::remove_file(&self.config.pid_file);
                }
            }
        }
    }
}

/// Check if a process is running by PID
fn is_process_running(pid: u32) -> bool {
    // Signal 0 checks existence without delivering anything
    unsafe { libc::kill(pid as i32, 0) == 0 }
}
