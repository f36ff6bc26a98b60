//! Unix socket server for brain sessions.
//!
//! Accepts connections, turns each into a [`Session`] and runs it through
//! the handler chain.

use crate::{error_line, parse_command, IpcError, Session, SessionHandler, MAX_COMMAND_LINE};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Limits applied to every session
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Time allowed for reading the command line, and again for the input
    pub timeout: Duration,
    /// Largest input payload accepted
    pub max_input_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_input_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Unix socket session server
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    chain: Arc<[Arc<dyn SessionHandler>]>,
    options: ServerOptions,
}

impl IpcServer {
    /// Create a new server bound to the given socket path
    pub async fn new<P: AsRef<Path>>(
        socket_path: P,
        chain: Vec<Arc<dyn SessionHandler>>,
        options: ServerOptions,
    ) -> Result<Self, IpcError> {
        let socket_path = socket_path.as_ref();

        // Remove stale socket file if it exists
        if socket_path.exists() {
            let _ = std::fs::remove_file(socket_path);
        }

        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(socket_path)?;

        // Only the owning user may open sessions
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!("Session server listening on {}", socket_path.display());

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
            chain: chain.into(),
            options,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept sessions until `shutdown` fires, then let in-flight sessions
    /// finish writing their responses.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), IpcError> {
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Session server stopping");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let chain = self.chain.clone();
                        let options = self.options.clone();
                        sessions.spawn(async move {
                            if let Err(e) = Self::handle_connection(stream, chain, options).await {
                                tracing::debug!("Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        tracing::warn!(error = %e, "Session task failed");
                    }
                }
            }
        }

        let in_flight = sessions.len();
        if in_flight > 0 {
            tracing::info!(sessions = in_flight, "Waiting for in-flight sessions");
        }
        while sessions.join_next().await.is_some() {}

        Ok(())
    }

    /// Handle a single connection
    async fn handle_connection(
        stream: UnixStream,
        chain: Arc<[Arc<dyn SessionHandler>]>,
        options: ServerOptions,
    ) -> Result<(), IpcError> {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let command = tokio::time::timeout(options.timeout, Self::read_command_line(&mut reader))
            .await
            .map_err(IpcError::Timeout)
            .and_then(|line| parse_command(&line?));

        let command = match command {
            Ok(command) => command,
            Err(e) => {
                write_half.write_all(error_line(&e).as_bytes()).await?;
                write_half.shutdown().await?;
                return Err(e);
            }
        };

        let mut session = Session::new(command, reader)
            .with_limits(options.max_input_bytes, options.timeout);

        for handler in chain.iter() {
            handler.handle(&mut session).await;
        }

        write_half.write_all(session.output()).await?;
        write_half.flush().await?;
        write_half.shutdown().await?;

        Ok(())
    }

    /// Read the command line, up to the first newline or end of stream
    async fn read_command_line(
        reader: &mut BufReader<OwnedReadHalf>,
    ) -> Result<String, IpcError> {
        let mut line = Vec::new();
        (&mut *reader)
            .take(MAX_COMMAND_LINE as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;

        if line.len() > MAX_COMMAND_LINE {
            return Err(IpcError::CommandTooLong);
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
