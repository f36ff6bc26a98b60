//! Configuration for the brain daemon and CLI.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Brain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainConfig {
    /// Unix socket path for sessions
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Root directory of the document tree
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// PID file path
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Rebuild when the content directory changes outside of sessions
    #[serde(default)]
    pub watch: bool,

    /// Debounce window for the content watcher
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,

    /// Time allowed for a client to send its command line
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Largest document body accepted by NEW
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/brain.sock")
}

fn default_content_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("brain")
        .join("content")
}

fn default_pid_file() -> PathBuf {
    PathBuf::from("/tmp/brain.pid")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_watch_debounce_ms() -> u64 {
    500
}

fn default_session_timeout_ms() -> u64 {
    5_000
}

fn default_max_input_bytes() -> usize {
    8 * 1024 * 1024 // 8MB
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            content_dir: default_content_dir(),
            pid_file: default_pid_file(),
            log_level: default_log_level(),
            watch: false,
            watch_debounce_ms: default_watch_debounce_ms(),
            session_timeout_ms: default_session_timeout_ms(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

impl BrainConfig {
    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brain")
            .join("config.yaml")
    }

    /// Load configuration from the default file.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// read or parsed is an error rather than being silently ignored.
    pub fn load() -> Result<Self, CoreError> {
        let config_path = Self::default_path();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Ensure the content directory exists
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.content_dir)
    }
}
