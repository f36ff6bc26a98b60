//! Coalescing rebuild worker.
//!
//! Any number of [`Updater::trigger`] calls made while a rebuild is pending
//! collapse into a single rebuild. The channel holds at most one signal, so
//! a trigger either queues it or finds one already waiting.
//!
//! Every trigger returns a [`Ticket`]. The worker records the highest ticket
//! issued before it starts walking the disk, and publishes it once the new
//! forest is in place, so `wait_for(ticket)` resolves only after a rebuild
//! that began after the trigger.

use crate::{Tree, TreeBuilder, TreeError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Sequence number of a rebuild request.
pub type Ticket = u64;

/// Handle used to request rebuilds of a [`Tree`].
#[derive(Debug, Clone)]
pub struct Updater {
    tx: mpsc::Sender<()>,
    requested: Arc<AtomicU64>,
    completed: watch::Receiver<Ticket>,
}

impl Updater {
    /// Spawn the rebuild worker.
    ///
    /// The worker runs until `shutdown` fires or every `Updater` is dropped.
    /// If a build fails the worker stops and its handle resolves to the
    /// error; the caller is expected to treat that as fatal.
    pub fn spawn(
        tree: Arc<Tree>,
        builder: TreeBuilder,
        shutdown: broadcast::Receiver<()>,
    ) -> (Self, JoinHandle<Result<(), TreeError>>) {
        let (tx, rx) = mpsc::channel(1);
        let (completed_tx, completed) = watch::channel(0);
        let requested = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            rx,
            requested: requested.clone(),
            completed: completed_tx,
            tree,
            builder,
            shutdown,
        };
        let handle = tokio::spawn(worker.run());

        (
            Self {
                tx,
                requested,
                completed,
            },
            handle,
        )
    }

    /// Mark the tree stale. Never blocks.
    pub fn trigger(&self) -> Ticket {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;

        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => {
                warn!(ticket, "Rebuild worker is not running, trigger dropped");
            }
        }

        ticket
    }

    /// Wait until a rebuild covering `ticket` has replaced the tree.
    pub async fn wait_for(&self, ticket: Ticket) -> Result<(), TreeError> {
        let mut completed = self.completed.clone();
        completed
            .wait_for(|done| *done >= ticket)
            .await
            .map(|_| ())
            .map_err(|_| TreeError::WorkerStopped)
    }

    /// Trigger a rebuild and wait for it.
    pub async fn sync(&self) -> Result<(), TreeError> {
        let ticket = self.trigger();
        self.wait_for(ticket).await
    }

    /// Highest ticket reflected by the tree.
    pub fn completed(&self) -> Ticket {
        *self.completed.borrow()
    }
}

struct Worker {
    rx: mpsc::Receiver<()>,
    requested: Arc<AtomicU64>,
    completed: watch::Sender<Ticket>,
    tree: Arc<Tree>,
    builder: TreeBuilder,
    shutdown: broadcast::Receiver<()>,
}

impl Worker {
    async fn run(mut self) -> Result<(), TreeError> {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.recv() => {
                    info!("Rebuild worker stopping");
                    return Ok(());
                }
                signal = self.rx.recv() => {
                    if signal.is_none() {
                        debug!("All updaters dropped, rebuild worker stopping");
                        return Ok(());
                    }
                }
            }

            // Read before walking: every trigger up to here is reflected
            let target = self.requested.load(Ordering::SeqCst);

            if let Err(e) = self.rebuild(target).await {
                error!(error = %e, root = %self.builder.root().display(), "Could not rebuild brain tree");
                return Err(e);
            }
        }
    }

    async fn rebuild(&self, target: Ticket) -> Result<(), TreeError> {
        let builder = self.builder.clone();
        let forest = tokio::task::spawn_blocking(move || builder.build())
            .await
            .map_err(|e| TreeError::Io(std::io::Error::other(e)))??;

        let generation = self.tree.replace(forest);
        self.completed.send_replace(target);

        debug!(generation, ticket = target, "Rebuild complete");
        Ok(())
    }
}
