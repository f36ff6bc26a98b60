//! Shared cache of the content tree.
//!
//! The forest is never patched in place. Every rebuild produces a new
//! [`Snapshot`] that replaces the previous one under a short write lock,
//! so readers always see a fully built generation.

use crate::{Node, TreeBuilder, TreeError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// One fully built generation of the content tree.
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    forest: Vec<Node>,
}

impl Snapshot {
    /// Number of replacements that produced this snapshot, 0 when empty.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Top-level nodes in enumeration order.
    pub fn forest(&self) -> &[Node] {
        &self.forest
    }

    /// Resolve a relative path to a file node.
    ///
    /// Each segment is matched against the base names of the current
    /// level. A file also matches its name without the document suffix.
    /// Directories are not readable and yield [`TreeError::IsDirectory`].
    pub fn find(&self, path: &str) -> Result<&Node, TreeError> {
        let mut level: &[Node] = &self.forest;
        let mut found: Option<&Node> = None;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let node = level
                .iter()
                .find(|n| n.matches_exact(segment))
                .or_else(|| level.iter().find(|n| n.matches_logical(segment)))
                .ok_or_else(|| TreeError::NotFound(path.to_string()))?;

            level = node.children();
            found = Some(node);
        }

        match found {
            Some(node) if node.is_dir() => Err(TreeError::IsDirectory(path.to_string())),
            Some(node) => Ok(node),
            None => Err(TreeError::NotFound(path.to_string())),
        }
    }

    /// Paths of every file node, depth first.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_leaf_paths(&self.forest, &mut paths);
        paths
    }
}

fn collect_leaf_paths(nodes: &[Node], out: &mut Vec<String>) {
    for node in nodes {
        if node.is_dir() {
            collect_leaf_paths(node.children(), out);
        } else {
            out.push(node.path.clone());
        }
    }
}

/// Process-wide content tree cache.
#[derive(Debug, Default)]
pub struct Tree {
    current: RwLock<Arc<Snapshot>>,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree populated by one synchronous build.
    pub fn load(builder: &TreeBuilder) -> Result<Self, TreeError> {
        let tree = Self::new();
        tree.replace(builder.build()?);
        Ok(tree)
    }

    /// Swap in a newly built forest and return its generation.
    pub fn replace(&self, forest: Vec<Node>) -> u64 {
        let mut current = self.current.write();
        let generation = current.generation + 1;
        *current = Arc::new(Snapshot { generation, forest });
        debug!(generation, "Tree replaced");
        generation
    }

    /// The current generation. Holds the lock only for the pointer copy.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Look up a file node by relative path in the current generation.
    pub fn find(&self, path: &str) -> Result<Node, TreeError> {
        self.snapshot().find(path).cloned()
    }

    /// Every file path in the current generation, depth first.
    pub fn list_leaf_paths(&self) -> Vec<String> {
        self.snapshot().leaf_paths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn doc(title: &str) -> Document {
        Document::parse(format!("---\ntitle: {}\n---\nbody", title).as_bytes()).unwrap()
    }

    fn sample_forest() -> Vec<Node> {
        vec![
            Node::directory(
                "notes",
                vec![
                    Node::file("notes/a.md", doc("A")),
                    Node::directory("notes/deep", vec![Node::file("notes/deep/b.md", doc("B"))]),
                ],
            ),
            Node::file("index.md", doc("Index")),
        ]
    }

    #[test]
    fn test_new_tree_is_empty() {
        let tree = Tree::new();
        assert_eq!(tree.generation(), 0);
        assert!(tree.list_leaf_paths().is_empty());
    }

    #[test]
    fn test_replace_bumps_generation() {
        let tree = Tree::new();
        assert_eq!(tree.replace(sample_forest()), 1);
        assert_eq!(tree.replace(Vec::new()), 2);
        assert!(tree.list_leaf_paths().is_empty());
    }

    #[test]
    fn test_find_file() {
        let tree = Tree::new();
        tree.replace(sample_forest());

        let node = tree.find("notes/deep/b.md").unwrap();
        assert_eq!(node.title(), "B");
        assert!(node.document().unwrap().raw.starts_with(b"---"));
    }

    #[test]
    fn test_find_without_suffix() {
        let tree = Tree::new();
        tree.replace(sample_forest());

        assert_eq!(tree.find("notes/a").unwrap().path, "notes/a.md");
        assert_eq!(tree.find("index").unwrap().path, "index.md");
    }

    #[test]
    fn test_find_directory_is_error() {
        let tree = Tree::new();
        tree.replace(sample_forest());

        assert!(matches!(tree.find("notes"), Err(TreeError::IsDirectory(_))));
        assert!(matches!(tree.find("notes/deep"), Err(TreeError::IsDirectory(_))));
    }

    #[test]
    fn test_find_missing_is_not_found() {
        let tree = Tree::new();
        tree.replace(sample_forest());

        assert!(matches!(tree.find("notes/zz.md"), Err(TreeError::NotFound(_))));
        assert!(matches!(tree.find("index.md/child"), Err(TreeError::NotFound(_))));
        assert!(matches!(tree.find(""), Err(TreeError::NotFound(_))));
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let tree = Tree::new();
        tree.replace(sample_forest());

        assert!(matches!(tree.find("Notes/a.md"), Err(TreeError::NotFound(_))));
    }

    #[test]
    fn test_leaf_paths_depth_first() {
        let tree = Tree::new();
        tree.replace(sample_forest());

        assert_eq!(
            tree.list_leaf_paths(),
            vec!["notes/a.md", "notes/deep/b.md", "index.md"]
        );
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let tree = Tree::new();
        tree.replace(sample_forest());

        let before = tree.snapshot();
        tree.replace(Vec::new());

        assert_eq!(before.generation(), 1);
        assert_eq!(before.leaf_paths().len(), 3);
        assert_eq!(tree.generation(), 2);
    }
}
