//! Content tree error types.

use thiserror::Error;

/// Errors that can occur while parsing, indexing or mutating content.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Document front matter is missing or malformed
    #[error("invalid brain node: {0}")]
    InvalidDocument(String),

    /// No node exists at the requested path
    #[error("{0} does not exist")]
    NotFound(String),

    /// The requested path resolves to a directory
    #[error("{0} is a directory")]
    IsDirectory(String),

    /// Destination of a move is already taken
    #[error("{0} already exists, move must be non-destructive")]
    AlreadyExists(String),

    /// Path is empty or escapes the content root
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// I/O error during file operations
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The rebuild worker is no longer running
    #[error("rebuild worker stopped")]
    WorkerStopped,

    /// File watcher error
    #[error("watcher error: {0}")]
    Watcher(String),
}

impl TreeError {
    /// Whether this error means the document itself was rejected.
    pub fn is_invalid_document(&self) -> bool {
        matches!(self, TreeError::InvalidDocument(_))
    }
}
