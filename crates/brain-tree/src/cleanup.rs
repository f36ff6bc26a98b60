//! Removal of directories left empty by a mutation.

use crate::path::parent;
use crate::TreeError;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Remove `relative_dir` and each of its ancestors while they are empty.
///
/// Stops at the first non-empty directory and never removes `root`.
/// A directory that is already gone counts as removed, so concurrent
/// cleanups of the same chain do not fail.
pub async fn remove_empty_ancestors(root: &Path, relative_dir: &str) -> Result<(), TreeError> {
    let mut current = relative_dir.trim_matches('/');

    while !current.is_empty() {
        let dir = root.join(current);

        match is_empty_dir(&dir).await {
            Ok(true) => match fs::remove_dir(&dir).await {
                Ok(()) => debug!(dir = %current, "Removed empty directory"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
            Ok(false) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        current = parent(current);
    }

    Ok(())
}

async fn is_empty_dir(dir: &Path) -> std::io::Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}
