//! Brain CLI
//!
//! Command-line interface for reading and editing the brain through a
//! running daemon.

use anyhow::{Context, Result};
use brain_core::BrainConfig;
use brain_ipc::{IpcClient, Verb, ERROR_PREFIX};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Seed for `brain new` when no file is given
const TEMPLATE: &str = "---\ntitle: \ntags: []\n---\n\n";

/// Marker the daemon uses for documents that fail validation
const INVALID_NODE: &str = "invalid brain node";

#[derive(Parser)]
#[command(name = "brain")]
#[command(about = "Brain - a tree of markdown notes served by brain-daemon")]
#[command(version)]
struct Cli {
    /// Daemon socket (default: from config)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or replace a document
    New {
        /// Document path, relative to the content root
        path: String,

        /// Read the document from a file instead of opening an editor
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List every document
    List,

    /// Edit a document in $EDITOR
    Edit {
        /// Document path, relative to the content root
        path: String,
    },

    /// Move a document
    Move { from: String, to: String },

    /// Delete a document
    Delete { path: String },

    /// Start the brain daemon
    Start {
        /// Run in foreground (for debugging)
        #[arg(short, long)]
        foreground: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Simple logging for CLI
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt().with_target(false).init();
    }

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BrainConfig::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => BrainConfig::load().context("Failed to load config")?,
    };
    let socket = cli.socket.clone().unwrap_or(config.socket_path);
    let client = IpcClient::with_socket_path(&socket);

    match cli.command {
        Commands::New { path, file } => cmd_new(&client, &path, file.as_deref()).await,
        Commands::List => cmd_list(&client).await,
        Commands::Edit { path } => cmd_edit(&client, &path).await,
        Commands::Move { from, to } => {
            let response = client.run_text(Verb::Move, &[from.as_str(), to.as_str()], None).await?;
            report(&response)
        }
        Commands::Delete { path } => {
            let response = client.run_text(Verb::Delete, &[path.as_str()], None).await?;
            report(&response)
        }
        Commands::Start { foreground } => {
            cmd_start(&client, cli.config.as_deref(), &socket, foreground)
        }
    }
}

async fn cmd_new(client: &IpcClient, path: &str, file: Option<&Path>) -> Result<()> {
    if let Some(file) = file {
        let content =
            std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
        let response = client.run_text(Verb::New, &[path], Some(content.as_slice())).await?;
        return report(&response);
    }

    let draft = draft_file(TEMPLATE.as_bytes())?;
    open_editor(draft.path())?;
    save_draft(client, path, draft).await
}

async fn cmd_list(client: &IpcClient) -> Result<()> {
    let response = client.run_text(Verb::List, &[], None).await?;
    if let Some(cause) = response.strip_prefix(ERROR_PREFIX) {
        anyhow::bail!("{}", cause.trim());
    }
    print!("{}", response);
    Ok(())
}

async fn cmd_edit(client: &IpcClient, path: &str) -> Result<()> {
    let original = client.run(Verb::Edit, &[path], None).await?;
    if let Some(cause) = original.strip_prefix(ERROR_PREFIX.as_bytes()) {
        anyhow::bail!("{}", String::from_utf8_lossy(cause).trim());
    }

    let draft = draft_file(&original)?;
    open_editor(draft.path())?;

    let edited = std::fs::read(draft.path()).context("Failed to read edited document")?;
    if edited == original {
        println!("No changes.");
        return Ok(());
    }

    save_draft(client, path, draft).await
}

/// Send a draft with NEW. A draft the daemon rejects is kept on disk.
async fn save_draft(client: &IpcClient, path: &str, draft: NamedTempFile) -> Result<()> {
    let content = std::fs::read(draft.path()).context("Failed to read draft")?;
    let response = client.run_text(Verb::New, &[path], Some(content.as_slice())).await?;
    tracing::debug!(path, bytes = content.len(), "Draft sent");

    if response.contains(INVALID_NODE) {
        let (_, kept) = draft.keep().context("Failed to keep draft")?;
        eprintln!("Draft kept at {}", kept.display());
    }

    report(&response)
}

fn cmd_start(
    client: &IpcClient,
    config: Option<&Path>,
    socket: &Path,
    foreground: bool,
) -> Result<()> {
    let mut command = std::process::Command::new("brain-daemon");
    if let Some(config) = config {
        command.arg("--config").arg(config);
    }
    command.arg("--socket").arg(socket);

    if foreground {
        println!("Starting brain daemon in foreground...");
        println!("Press Ctrl+C to stop.");

        let status = command
            .status()
            .context("Failed to start daemon. Is brain-daemon in PATH?")?;

        if !status.success() {
            anyhow::bail!("Daemon exited with error");
        }
        return Ok(());
    }

    if client.is_daemon_running() {
        println!("Brain daemon is already running.");
        return Ok(());
    }

    let child = command
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("Failed to start daemon")?;

    println!("✓ Brain daemon started (PID: {})", child.id());
    Ok(())
}

/// Print an `OK:` response, or turn an `ERROR:` response into a failure.
fn report(response: &str) -> Result<()> {
    if let Some(cause) = response.strip_prefix(ERROR_PREFIX) {
        anyhow::bail!("{}", cause.trim());
    }
    print!("{}", response);
    Ok(())
}

fn draft_file(content: &[u8]) -> Result<NamedTempFile> {
    use std::io::Write;

    let mut draft = tempfile::Builder::new()
        .prefix("brain-")
        .suffix(".md")
        .tempfile()
        .context("Failed to create draft file")?;
    draft.write_all(content)?;
    draft.flush()?;
    Ok(draft)
}

/// Run `$EDITOR` (default `vi`) on `path` and wait for it to exit.
fn open_editor(path: &Path) -> Result<()> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");
    tracing::debug!(editor = %editor, path = %path.display(), "Opening editor");

    let status = std::process::Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to run editor {}", program))?;

    if !status.success() {
        anyhow::bail!("Editor exited with error");
    }
    Ok(())
}
