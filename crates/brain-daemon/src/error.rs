//! Session command errors.
//!
//! The display text of these errors is what a client sees after `ERROR: `.

use brain_ipc::{IpcError, Verb};
use brain_tree::TreeError;
use thiserror::Error;

/// Errors that can occur while executing a session command
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Fewer positional arguments than the verb takes
    #[error("{verb} requires {expected} argument(s)")]
    MissingArgument { verb: Verb, expected: usize },

    /// Document paths must carry the document suffix
    #[error("brain node path must end with \".md\": {0}")]
    MissingSuffix(String),

    /// Filesystem operation failed
    #[error("{op} {path}: {source}")]
    Fs {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Validation, lookup or cleanup failed
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// The session input could not be read
    #[error(transparent)]
    Input(#[from] IpcError),
}

impl HandlerError {
    /// Build a closure that wraps an I/O error with the operation and path.
    pub(crate) fn fs(op: &'static str, path: &str) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_string();
        move |source| HandlerError::Fs { op, path, source }
    }
}
