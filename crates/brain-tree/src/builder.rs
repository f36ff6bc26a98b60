//! Tree builder over the content directory.

use crate::path::join;
use crate::{Document, Node, TreeError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Builds a forest of nodes by walking the content root.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    root: PathBuf,
}

impl TreeBuilder {
    /// Create a builder for the given content root.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Content root this builder walks.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the whole forest.
    pub fn build(&self) -> Result<Vec<Node>, TreeError> {
        let forest = self.build_from("")?;
        debug!(root = %self.root.display(), entries = forest.len(), "Tree built");
        Ok(forest)
    }

    /// Build the subtree below `relative`.
    ///
    /// Entries keep the order the filesystem returns them in. Documents that
    /// fail validation are skipped; any other error aborts the build.
    pub fn build_from(&self, relative: &str) -> Result<Vec<Node>, TreeError> {
        let mut nodes = Vec::new();

        for entry in fs::read_dir(self.root.join(relative))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative_path = join(relative, &name);

            // Follow symlinks so linked directories are walked like real ones
            let metadata = fs::metadata(entry.path())?;

            if metadata.is_dir() {
                let children = self.build_from(&relative_path)?;
                nodes.push(Node::directory(relative_path, children));
                continue;
            }

            let raw = fs::read(entry.path())?;
            match Document::parse(&raw) {
                Ok(document) => nodes.push(Node::file(relative_path, document)),
                Err(e) if e.is_invalid_document() => {
                    warn!(path = %relative_path, reason = %e, "Skipping invalid brain node");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(nodes)
    }
}
