//! Per-connection session and the middleware seam.

use crate::{IpcError, Verb};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

/// Default input limit (8MB)
const DEFAULT_MAX_INPUT: usize = 8 * 1024 * 1024;

/// Default time allowed to read the whole input
const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_secs(5);

/// One command issued by an already connected client.
///
/// Output is buffered and flushed by the server once every handler in the
/// chain has run.
pub struct Session {
    id: Uuid,
    command: Vec<String>,
    input: Box<dyn AsyncRead + Send + Unpin>,
    output: Vec<u8>,
    max_input: usize,
    input_timeout: Duration,
    started: Instant,
}

impl Session {
    /// Create a session over the given command tokens and input stream.
    pub fn new<R>(command: Vec<String>, input: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            command,
            input: Box::new(input),
            output: Vec::new(),
            max_input: DEFAULT_MAX_INPUT,
            input_timeout: DEFAULT_INPUT_TIMEOUT,
            started: Instant::now(),
        }
    }

    /// Set the input size limit and read timeout.
    pub fn with_limits(mut self, max_input: usize, input_timeout: Duration) -> Self {
        self.max_input = max_input;
        self.input_timeout = input_timeout;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Command tokens, verb first.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// The recognized verb, if any.
    pub fn verb(&self) -> Option<Verb> {
        self.command.first().and_then(|token| Verb::parse(token))
    }

    /// Positional argument `index` (0 is the first token after the verb).
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.command.get(index + 1).map(String::as_str)
    }

    /// Read the whole input stream.
    pub async fn read_input(&mut self) -> Result<Vec<u8>, IpcError> {
        let limit = self.max_input;
        let mut buf = Vec::new();
        let mut reader = (&mut self.input).take(limit as u64 + 1);

        tokio::time::timeout(self.input_timeout, reader.read_to_end(&mut buf)).await??;

        if buf.len() > limit {
            return Err(IpcError::InputTooLarge(limit));
        }
        Ok(buf)
    }

    /// Append raw bytes to the output.
    pub fn write(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    /// Append text to the output.
    pub fn print(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Time since the session was accepted.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// A link in the session middleware chain.
///
/// The server calls every handler in order, so a handler that does not
/// recognize a session simply returns and control passes to the next one.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    async fn handle(&self, session: &mut Session);
}

/// Logs every finished session.
pub struct LoggingMiddleware;

#[async_trait]
impl SessionHandler for LoggingMiddleware {
    async fn handle(&self, session: &mut Session) {
        let verb = session
            .command()
            .first()
            .map(String::as_str)
            .unwrap_or_default();

        tracing::info!(
            session = %session.id(),
            command = %verb,
            args = session.command().len().saturating_sub(1),
            bytes = session.output().len(),
            duration_ms = session.elapsed().as_millis() as u64,
            "Session finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<String> {
        crate::parse_command(line).unwrap()
    }

    #[test]
    fn test_session_verb_and_args() {
        let session = Session::new(tokens("move a.md b.md"), tokio::io::empty());
        assert_eq!(session.verb(), Some(Verb::Move));
        assert_eq!(session.arg(0), Some("a.md"));
        assert_eq!(session.arg(1), Some("b.md"));
        assert_eq!(session.arg(2), None);
    }

    #[test]
    fn test_session_unknown_verb() {
        let session = Session::new(tokens("PING"), tokio::io::empty());
        assert_eq!(session.verb(), None);
    }

    #[tokio::test]
    async fn test_read_input() {
        let mut session = Session::new(tokens("NEW a.md"), &b"hello"[..]);
        assert_eq!(session.read_input().await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_read_input_limit() {
        let mut session = Session::new(tokens("NEW a.md"), &b"0123456789"[..])
            .with_limits(4, Duration::from_secs(1));
        assert!(matches!(
            session.read_input().await,
            Err(IpcError::InputTooLarge(4))
        ));
    }

    #[test]
    fn test_output_buffer() {
        let mut session = Session::new(tokens("LIST"), tokio::io::empty());
        session.print("a.md\n");
        session.write(b"b.md\n");
        assert_eq!(session.output(), b"a.md\nb.md\n");
    }

    #[tokio::test]
    async fn test_logging_middleware_leaves_output() {
        let mut session = Session::new(tokens("LIST"), tokio::io::empty());
        session.print("x\n");
        LoggingMiddleware.handle(&mut session).await;
        assert_eq!(session.output(), b"x\n");
    }
}
