//! Brain content tree
//!
//! This crate keeps an in-memory index of the markdown documents stored
//! under a content root:
//! - Document parsing with YAML front matter and HTML rendering
//! - Recursive tree building from the content directory
//! - A lock-protected cache that is swapped wholesale on every rebuild
//! - A coalescing rebuild worker and an optional filesystem watcher
//! - Cleanup of directories left empty by a mutation

mod builder;
mod cache;
pub mod cleanup;
mod error;
mod node;
pub mod path;
mod updater;
pub mod watcher;

pub use builder::TreeBuilder;
pub use cache::{Snapshot, Tree};
pub use cleanup::remove_empty_ancestors;
pub use error::TreeError;
pub use node::{Document, Node, NodeKind};
pub use path::DOCUMENT_SUFFIX;
pub use updater::{Ticket, Updater};
pub use watcher::{ContentWatcher, WatcherOptions};
