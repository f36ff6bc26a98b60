//! Content directory watcher.
//!
//! Edits made to the content root outside of a session (editors, sync
//! tools) are picked up by triggering a full rebuild for every debounced
//! batch of filesystem events.

use crate::{TreeError, Updater};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for the content watcher.
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Debounce duration
    pub debounce_duration: Duration,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// Watches the content root and requests rebuilds. Stops when dropped.
pub struct ContentWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl ContentWatcher {
    /// Start watching `root` recursively.
    pub fn start(root: &Path, options: WatcherOptions, updater: Updater) -> Result<Self, TreeError> {
        let mut debouncer = new_debouncer(
            options.debounce_duration,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let relevant = events
                        .iter()
                        .filter(|e| !e.kind.is_access() && !e.kind.is_other())
                        .count();
                    if relevant > 0 {
                        let ticket = updater.trigger();
                        debug!(events = relevant, ticket, "Content changed on disk");
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "Watcher error");
                    }
                }
            },
        )
        .map_err(|e| TreeError::Watcher(e.to_string()))?;

        debouncer
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| TreeError::Watcher(e.to_string()))?;

        info!(path = %root.display(), "Started watching content");

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}
