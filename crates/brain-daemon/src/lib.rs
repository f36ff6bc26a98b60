//! Brain Daemon
//!
//! Serves a directory of markdown documents to `brain` clients. Sessions
//! mutate the content directory directly; an in-memory tree answers reads
//! and is rebuilt in the background after every mutation.

mod daemon;
mod error;
mod handler;
mod signals;

pub use daemon::Daemon;
pub use error::HandlerError;
pub use handler::BrainHandler;
