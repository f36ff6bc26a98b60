//! Command session handler.
//!
//! Mutations (`NEW`, `MOVE`, `DELETE`) act on the content directory and
//! then trigger a rebuild; reads (`LIST`, `EDIT`) are answered from the
//! cached tree. A read issued right after a mutation may still see the
//! previous generation until the triggered rebuild lands.

use crate::HandlerError;
use async_trait::async_trait;
use brain_ipc::{error_line, ok_line, Session, SessionHandler, Verb};
use brain_tree::path::{clean_relative, has_document_suffix, parent};
use brain_tree::{remove_empty_ancestors, Document, Tree, TreeError, Updater};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory mode for parents created by NEW and MOVE
const DIR_MODE: u32 = 0o770;

/// Handles brain session commands
pub struct BrainHandler {
    content_dir: PathBuf,
    tree: Arc<Tree>,
    updater: Updater,
}

impl BrainHandler {
    /// Create a new handler
    pub fn new(content_dir: impl Into<PathBuf>, tree: Arc<Tree>, updater: Updater) -> Self {
        Self {
            content_dir: content_dir.into(),
            tree,
            updater,
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Validate and store the session input as a document.
    async fn new_node(&self, session: &mut Session, path: &str) -> Result<String, HandlerError> {
        let rel_path = clean_relative(path)?;
        if !has_document_suffix(&rel_path) {
            return Err(HandlerError::MissingSuffix(path.to_string()));
        }

        let data = session.read_input().await?;
        Document::parse(&data)?;

        let result = self.write_document(&rel_path, &data, false).await;
        self.updater.trigger();
        result?;

        tracing::info!(path = %rel_path, bytes = data.len(), "Saved brain node");
        Ok(format!("saved {}", rel_path))
    }

    /// Paths of every document in the current tree, one per line.
    fn list(&self) -> String {
        let snapshot = self.tree.snapshot();
        let mut out = String::new();
        for path in snapshot.leaf_paths() {
            out.push_str(&path);
            out.push('\n');
        }
        out
    }

    /// Raw source of a cached document.
    fn edit(&self, path: &str) -> Result<Vec<u8>, HandlerError> {
        let rel_path = clean_relative(path)?;
        let node = self.tree.find(&rel_path)?;
        let document = node
            .document()
            .ok_or_else(|| TreeError::IsDirectory(rel_path.clone()))?;
        Ok(document.raw.clone())
    }

    /// Move a document. Never overwrites the destination.
    async fn move_node(&self, from: &str, to: &str) -> Result<String, HandlerError> {
        let from_rel = clean_relative(from)?;
        let to_rel = clean_relative(to)?;

        if from_rel == to_rel {
            self.updater.trigger();
            return Ok(format!("moved {} to {}", from_rel, to_rel));
        }

        if !has_document_suffix(&to_rel) {
            return Err(HandlerError::MissingSuffix(to.to_string()));
        }

        let result = self.relocate(&from_rel, &to_rel).await;
        // Reconcile the cache even when the move was refused
        self.updater.trigger();
        result?;

        tracing::info!(from = %from_rel, to = %to_rel, "Moved brain node");
        Ok(format!("moved {} to {}", from_rel, to_rel))
    }

    async fn relocate(&self, from_rel: &str, to_rel: &str) -> Result<(), HandlerError> {
        let to_path = self.content_dir.join(to_rel);

        match fs::symlink_metadata(&to_path).await {
            Ok(_) => return Err(TreeError::AlreadyExists(to_rel.to_string()).into()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(HandlerError::fs("stat", to_rel)(e)),
        }

        // The lookup may resolve a suffix-less name, so act on the node's path
        let node = self.tree.find(from_rel)?;
        let document = node
            .document()
            .ok_or_else(|| TreeError::IsDirectory(from_rel.to_string()))?;

        self.write_document(to_rel, &document.raw, true).await?;

        fs::remove_file(self.content_dir.join(&node.path))
            .await
            .map_err(HandlerError::fs("remove", &node.path))?;

        remove_empty_ancestors(&self.content_dir, parent(&node.path)).await?;
        Ok(())
    }

    /// Delete a document straight from disk.
    async fn delete(&self, path: &str) -> Result<String, HandlerError> {
        let rel_path = clean_relative(path)?;

        let result = self.remove(&rel_path).await;
        self.updater.trigger();
        result?;

        tracing::info!(path = %rel_path, "Deleted brain node");
        Ok(format!("deleted {}", rel_path))
    }

    async fn remove(&self, rel_path: &str) -> Result<(), HandlerError> {
        fs::remove_file(self.content_dir.join(rel_path))
            .await
            .map_err(HandlerError::fs("remove", rel_path))?;

        remove_empty_ancestors(&self.content_dir, parent(rel_path)).await?;
        Ok(())
    }

    /// Write a document, creating parent directories.
    ///
    /// With `exclusive` the write fails if the file already exists, which
    /// closes the gap between MOVE's existence check and the write.
    async fn write_document(
        &self,
        rel_path: &str,
        data: &[u8],
        exclusive: bool,
    ) -> Result<(), HandlerError> {
        let target = self.content_dir.join(rel_path);

        if let Some(dir) = target.parent() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(DIR_MODE)
                .create(dir)
                .await
                .map_err(HandlerError::fs("mkdir", parent(rel_path)))?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true);
        if exclusive {
            options.create_new(true);
        } else {
            options.create(true).truncate(true);
        }

        let mut file = match options.open(&target).await {
            Ok(file) => file,
            Err(e) if exclusive && e.kind() == ErrorKind::AlreadyExists => {
                return Err(TreeError::AlreadyExists(rel_path.to_string()).into());
            }
            Err(e) => return Err(HandlerError::fs("open", rel_path)(e)),
        };

        file.write_all(data)
            .await
            .map_err(HandlerError::fs("write", rel_path))?;
        file.flush()
            .await
            .map_err(HandlerError::fs("write", rel_path))?;

        Ok(())
    }
}

#[async_trait]
impl SessionHandler for BrainHandler {
    async fn handle(&self, session: &mut Session) {
        // Unknown verbs fall through to the next handler
        let Some(verb) = session.verb() else {
            return;
        };

        let args: Vec<String> = session.command()[1..].to_vec();
        if args.len() < verb.arity() {
            let err = HandlerError::MissingArgument {
                verb,
                expected: verb.arity(),
            };
            session.print(&error_line(err));
            return;
        }

        let result = match verb {
            Verb::New => self.new_node(session, &args[0]).await,
            Verb::List => {
                let listing = self.list();
                session.print(&listing);
                return;
            }
            Verb::Edit => match self.edit(&args[0]) {
                Ok(raw) => {
                    session.write(&raw);
                    return;
                }
                Err(e) => Err(e),
            },
            Verb::Move => self.move_node(&args[0], &args[1]).await,
            Verb::Delete => self.delete(&args[0]).await,
        };

        match result {
            Ok(message) => session.print(&ok_line(message)),
            Err(e) => {
                tracing::debug!(session = %session.id(), command = %verb, error = %e, "Command failed");
                session.print(&error_line(e));
            }
        }
    }
}
