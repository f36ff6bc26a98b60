//! Brain Daemon
//!
//! Background process that serves the brain content tree over a Unix socket.

use anyhow::{Context, Result};
use brain_core::BrainConfig;
use brain_daemon::Daemon;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brain-daemon")]
#[command(about = "Serve a brain content directory to brain clients")]
#[command(version)]
struct Args {
    /// Config file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the content directory
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Override the socket path
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Rebuild when files change outside of sessions
    #[arg(long)]
    watch: bool,
}

fn load_config(args: &Args) -> Result<BrainConfig> {
    let mut config = match &args.config {
        Some(path) => BrainConfig::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => BrainConfig::load().context("Failed to load config")?,
    };

    if let Some(dir) = &args.content_dir {
        config.content_dir = dir.clone();
    }
    if let Some(socket) = &args.socket {
        config.socket_path = socket.clone();
    }
    if args.watch {
        config.watch = true;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting brain daemon v{}", env!("CARGO_PKG_VERSION"));

    let daemon = Daemon::new(config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(daemon.run())
}
