//! Session transport errors.
//!
//! Errors raised while reading a session's input reach the client as the
//! text of an `ERROR:` line, so their messages are lowercase like the
//! other session errors.

use thiserror::Error;

/// Errors from the session server, sessions and the client
#[derive(Debug, Error)]
pub enum IpcError {
    /// Socket or stream failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Command line exceeded [`MAX_COMMAND_LINE`](crate::MAX_COMMAND_LINE)
    #[error("command line too long (max 4KB)")]
    CommandTooLong,

    #[error("empty command")]
    EmptyCommand,

    /// Session input exceeded the configured limit
    #[error("input too large (max {0} bytes)")]
    InputTooLarge(usize),

    /// Argument cannot be sent on a space-delimited command line
    #[error("invalid argument: {0:?}")]
    InvalidArgument(String),

    /// Command line or input not received in time
    #[error("session timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("connection to brain daemon failed: {0}")]
    ConnectionFailed(String),

    /// No socket at the configured path
    #[error("brain daemon is not running (no socket)")]
    DaemonNotRunning,
}
