//! Brain session protocol and Client/Server
//!
//! This crate provides the plain-text session protocol and the Unix socket
//! client/server used to issue commands against a running brain daemon.

mod client;
mod error;
mod protocol;
mod server;
mod session;

pub use client::IpcClient;
pub use error::IpcError;
pub use protocol::*;
pub use server::{IpcServer, ServerOptions};
pub use session::{LoggingMiddleware, Session, SessionHandler};
