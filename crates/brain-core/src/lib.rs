//! Brain Core Components
//!
//! Configuration shared by the brain daemon and the `brain` CLI.

mod config;
mod error;

pub use config::BrainConfig;
pub use error::CoreError;
