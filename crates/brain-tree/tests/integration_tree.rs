//! Tree cache and rebuild worker against a real content directory.

use brain_tree::{NodeKind, Tree, TreeBuilder, TreeError, Updater};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::broadcast;

fn write_doc(root: &Path, rel: &str, title: &str) {
    let path = root.join(rel);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).unwrap();
    }
    fs::write(path, format!("---\ntitle: {}\n---\n# {}\n", title, title)).unwrap();
}

#[test]
fn test_nested_forest_shape() {
    let temp_dir = tempdir().unwrap();
    write_doc(temp_dir.path(), "linux/net/tcp.md", "TCP");
    write_doc(temp_dir.path(), "linux/intro.md", "Intro");
    fs::create_dir_all(temp_dir.path().join("empty")).unwrap();

    let tree = Tree::load(&TreeBuilder::new(temp_dir.path())).unwrap();
    let snapshot = tree.snapshot();

    let linux = snapshot
        .forest()
        .iter()
        .find(|n| n.path == "linux")
        .unwrap();
    assert!(matches!(&linux.kind, NodeKind::Directory { title, .. } if title == "linux"));
    assert_eq!(linux.children().len(), 2);

    let empty = snapshot.forest().iter().find(|n| n.path == "empty").unwrap();
    assert!(empty.is_dir());
    assert!(empty.children().is_empty());

    let mut leaves = tree.list_leaf_paths();
    leaves.sort();
    assert_eq!(leaves, vec!["linux/intro.md", "linux/net/tcp.md"]);

    let tcp = tree.find("linux/net/tcp").unwrap();
    assert_eq!(tcp.title(), "TCP");
    assert!(tcp.document().unwrap().rendered.contains("<h1>TCP</h1>"));

    assert!(matches!(tree.find("linux/net"), Err(TreeError::IsDirectory(_))));
    assert!(matches!(tree.find("Linux/intro.md"), Err(TreeError::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readers_see_whole_generations() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path().to_path_buf();
    for i in 0..20 {
        write_doc(&root, &format!("d{}/doc.md", i), "Doc");
    }

    let builder = TreeBuilder::new(&root);
    let tree = Arc::new(Tree::load(&builder).unwrap());
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let (updater, _handle) = Updater::spawn(tree.clone(), builder, shutdown_rx);

    let reader = {
        let tree = tree.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let snapshot = tree.snapshot();
                let count = snapshot.leaf_paths().len();
                // Either before or after the change below, never in between
                assert!(count == 20 || count == 40, "saw {} leaves", count);
                tokio::task::yield_now().await;
            }
        })
    };

    for i in 20..40 {
        write_doc(&root, &format!("d{}/doc.md", i), "Doc");
    }
    let before = tree.snapshot();
    updater.sync().await.unwrap();

    reader.await.unwrap();
    assert_eq!(tree.list_leaf_paths().len(), 40);
    // Snapshots taken earlier stay valid after the swap
    assert_eq!(before.leaf_paths().len(), 20);
    assert!(tree.generation() > before.generation());
}

#[tokio::test]
async fn test_invalid_document_does_not_block_rebuild() {
    let temp_dir = tempdir().unwrap();
    let builder = TreeBuilder::new(temp_dir.path());
    let tree = Arc::new(Tree::load(&builder).unwrap());
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let (updater, _handle) = Updater::spawn(tree.clone(), builder, shutdown_rx);

    write_doc(temp_dir.path(), "good.md", "Good");
    fs::write(temp_dir.path().join("bad.md"), "---\ntitle: [\n---\n").unwrap();
    updater.sync().await.unwrap();

    assert_eq!(tree.list_leaf_paths(), vec!["good.md"]);
}
