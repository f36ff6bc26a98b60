//! End-to-end session tests over a real Unix socket.

use brain_daemon::BrainHandler;
use brain_ipc::{IpcClient, IpcServer, LoggingMiddleware, ServerOptions, SessionHandler, Verb};
use brain_tree::{Tree, TreeBuilder, Updater};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::broadcast;

const DOC_A: &[u8] = b"---\ntitle: A\n---\nbody";

struct Harness {
    dir: TempDir,
    client: IpcClient,
    updater: Updater,
    shutdown: broadcast::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start() -> Self {
        let dir = tempdir().unwrap();
        let content = dir.path().join("content");
        std::fs::create_dir(&content).unwrap();
        Self::start_in(dir).await
    }

    async fn start_in(dir: TempDir) -> Self {
        let content = dir.path().join("content");
        let socket = dir.path().join("brain.sock");
        let (shutdown, _) = broadcast::channel(1);

        let builder = TreeBuilder::new(&content);
        let tree = Arc::new(Tree::load(&builder).unwrap());
        let (updater, _worker) = Updater::spawn(tree.clone(), builder, shutdown.subscribe());

        let chain: Vec<Arc<dyn SessionHandler>> = vec![
            Arc::new(BrainHandler::new(&content, tree, updater.clone())),
            Arc::new(LoggingMiddleware),
        ];
        let server = IpcServer::new(&socket, chain, ServerOptions::default())
            .await
            .unwrap();

        let shutdown_rx = shutdown.subscribe();
        let server = tokio::spawn(async move {
            server.run(shutdown_rx).await.unwrap();
        });

        Self {
            client: IpcClient::with_socket_path(&socket),
            dir,
            updater,
            shutdown,
            server,
        }
    }

    fn content(&self) -> std::path::PathBuf {
        self.dir.path().join("content")
    }

    async fn run(&self, verb: Verb, args: &[&str], input: Option<&[u8]>) -> String {
        self.client.run_text(verb, args, input).await.unwrap()
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.server)
            .await
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn test_document_lifecycle() {
    let h = Harness::start().await;

    let out = h.run(Verb::New, &["notes/a.md"], Some(DOC_A)).await;
    assert_eq!(out, "OK: saved notes/a.md\n");

    h.updater.sync().await.unwrap();
    assert_eq!(h.run(Verb::List, &[], None).await, "notes/a.md\n");

    let raw = h.client.run(Verb::Edit, &["notes/a.md"], None).await.unwrap();
    assert_eq!(raw, DOC_A);

    let out = h.run(Verb::Move, &["notes/a.md", "notes/b.md"], None).await;
    assert_eq!(out, "OK: moved notes/a.md to notes/b.md\n");
    assert!(h.content().join("notes").is_dir());

    let out = h.run(Verb::Delete, &["notes/b.md"], None).await;
    assert_eq!(out, "OK: deleted notes/b.md\n");
    assert!(!h.content().join("notes").exists());

    h.updater.sync().await.unwrap();
    assert_eq!(h.run(Verb::List, &[], None).await, "");

    h.stop().await;
}

#[tokio::test]
async fn test_rejected_save_leaves_disk_untouched() {
    let h = Harness::start().await;

    let out = h
        .run(Verb::New, &["notes/bad.md"], Some(&b"---\ntags: [x]\n---\n"[..]))
        .await;
    assert!(out.starts_with("ERROR: invalid brain node"));
    assert!(!h.content().join("notes").exists());

    let out = h.run(Verb::New, &["notes/a.txt"], Some(DOC_A)).await;
    assert!(out.starts_with("ERROR: "));
    assert!(!h.content().join("notes").exists());

    h.stop().await;
}

#[tokio::test]
async fn test_move_is_non_destructive() {
    let h = Harness::start().await;
    let doc_b: &[u8] = b"---\ntitle: B\n---\nother";

    h.run(Verb::New, &["a.md"], Some(DOC_A)).await;
    h.run(Verb::New, &["b.md"], Some(doc_b)).await;
    h.updater.sync().await.unwrap();

    let out = h.run(Verb::Move, &["a.md", "b.md"], None).await;
    assert!(out.starts_with("ERROR: "));
    assert_eq!(std::fs::read(h.content().join("a.md")).unwrap(), DOC_A);
    assert_eq!(std::fs::read(h.content().join("b.md")).unwrap(), doc_b);

    let out = h.run(Verb::Move, &["a.md", "a.md"], None).await;
    assert_eq!(out, "OK: moved a.md to a.md\n");
    assert_eq!(std::fs::read(h.content().join("a.md")).unwrap(), DOC_A);

    h.stop().await;
}

#[tokio::test]
async fn test_delete_cleans_up_to_root() {
    let h = Harness::start().await;

    h.run(Verb::New, &["a/b/c/doc.md"], Some(DOC_A)).await;
    std::fs::create_dir(h.content().join("a/keep")).unwrap();

    let out = h.run(Verb::Delete, &["a/b/c/doc.md"], None).await;
    assert_eq!(out, "OK: deleted a/b/c/doc.md\n");
    assert!(!h.content().join("a/b").exists());
    assert!(h.content().join("a/keep").is_dir());

    std::fs::remove_dir(h.content().join("a/keep")).unwrap();
    h.run(Verb::New, &["a/b/c/doc.md"], Some(DOC_A)).await;
    h.run(Verb::Delete, &["a/b/c/doc.md"], None).await;
    assert!(!h.content().join("a").exists());
    assert!(h.content().is_dir());

    h.stop().await;
}

#[tokio::test]
async fn test_malformed_node_is_isolated() {
    let dir = tempdir().unwrap();
    let content = dir.path().join("content");
    std::fs::create_dir(&content).unwrap();
    for i in 0..9 {
        std::fs::write(
            content.join(format!("doc{}.md", i)),
            format!("---\ntitle: Doc {}\n---\n", i),
        )
        .unwrap();
    }
    std::fs::write(content.join("broken.md"), "no front matter").unwrap();

    let h = Harness::start_in(dir).await;

    let listing = h.run(Verb::List, &[], None).await;
    assert_eq!(listing.lines().count(), 9);
    assert!(!listing.contains("broken.md"));

    let out = h.run(Verb::Edit, &["broken.md"], None).await;
    assert_eq!(out, "ERROR: broken.md does not exist\n");

    h.stop().await;
}

#[tokio::test]
async fn test_unknown_command_gets_empty_response() {
    let h = Harness::start().await;

    let mut stream = tokio::net::UnixStream::connect(h.dir.path().join("brain.sock"))
        .await
        .unwrap();
    stream.write_all(b"FROB x\n").await.unwrap();
    stream.shutdown().await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    assert!(response.is_empty());

    h.stop().await;
}
