//! Client for issuing commands to the brain daemon.

use crate::{format_command, IpcError, Verb};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

/// Default socket path
const DEFAULT_SOCKET_PATH: &str = "/tmp/brain.sock";

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Request/response timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client that runs one session per command
pub struct IpcClient {
    socket_path: PathBuf,
    request_timeout: Duration,
}

impl IpcClient {
    /// Create a client with default socket path
    pub fn new() -> Self {
        Self::with_socket_path(DEFAULT_SOCKET_PATH)
    }

    /// Create a client with custom socket path
    pub fn with_socket_path<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Limit on a whole session, from sending the command to reading the
    /// response
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check if daemon is running
    pub fn is_daemon_running(&self) -> bool {
        self.socket_path.exists()
    }

    /// Run a command and return the raw response
    pub async fn run(
        &self,
        verb: Verb,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> Result<Vec<u8>, IpcError> {
        let line = format_command(verb, args)?;
        let mut stream = self.connect().await?;

        tokio::time::timeout(self.request_timeout, async {
            stream.write_all(line.as_bytes()).await?;
            if let Some(input) = input {
                stream.write_all(input).await?;
            }
            // Closing our half marks the end of the input
            stream.shutdown().await?;

            let mut response = Vec::new();
            stream.read_to_end(&mut response).await?;
            Ok::<_, IpcError>(response)
        })
        .await?
    }

    /// Run a command and return the response as text
    pub async fn run_text(
        &self,
        verb: Verb,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> Result<String, IpcError> {
        let response = self.run(verb, args, input).await?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    async fn connect(&self) -> Result<UnixStream, IpcError> {
        if !self.socket_path.exists() {
            return Err(IpcError::DaemonNotRunning);
        }

        tokio::time::timeout(CONNECT_TIMEOUT, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| IpcError::ConnectionFailed("Connection timed out".to_string()))?
            .map_err(IpcError::from)
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}
