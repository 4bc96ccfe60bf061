//! End-to-end tests: start the server on an ephemeral port and talk raw HTTP to it.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use grapher_web::{Config, Server, ServerError, ShutdownHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    task: JoinHandle<grapher_web::Result<()>>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    /// Layout: `<tmp>/ui/index.html`, `<tmp>/ui/app/main.js`, `<tmp>/secret.txt`
    fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ui");
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::write(root.join("index.html"), "<html>ok</html>").unwrap();
        std::fs::write(root.join("app/main.js"), "export const x = 1;\n").unwrap();
        std::fs::write(root.join("styles.css"), "body { margin: 0 }").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "do not serve").unwrap();

        let server = Server::start(config(&root, 0)).unwrap();
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(server.run());

        Self {
            addr,
            shutdown,
            task,
            _dir: dir,
        }
    }

    async fn request(&self, raw: &str) -> Reply {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();

        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
            .await
            .expect("server did not close the connection")
            .unwrap();
        Reply::parse(&buf)
    }

    async fn get(&self, path: &str) -> Reply {
        self.request(&format!(
            "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
        ))
        .await
    }

    async fn stop(self) {
        self.shutdown.stop();
        self.task.await.unwrap().unwrap();
    }
}

fn config(root: &Path, port: u16) -> Config {
    let mut cfg = Config::default();
    cfg.server.host = "127.0.0.1".to_string();
    cfg.server.port = port;
    cfg.assets.root_dir = root.to_path_buf();
    cfg.logging.access_log = false;
    cfg
}

struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Reply {
    fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("no header terminator");
        let head = std::str::from_utf8(&raw[..split]).unwrap();
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let status = status_line.split(' ').nth(1).unwrap().parse().unwrap();
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        Self {
            status,
            headers,
            body: raw[split + 4..].to_vec(),
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[tokio::test]
async fn test_index_scenario() {
    let server = TestServer::start();

    let reply = server.get("/index.html").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"<html>ok</html>");
    assert_eq!(reply.header("content-length"), Some("15"));
    assert!(reply.header("content-type").unwrap().starts_with("text/html"));

    let reply = server.get("/").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"<html>ok</html>");

    let reply = server.get("/missing.txt").await;
    assert_eq!(reply.status, 404);

    let reply = server.get("/../secret.txt").await;
    assert_eq!(reply.status, 403);
    assert_ne!(reply.body, b"do not serve");

    server.stop().await;
}

#[tokio::test]
async fn test_assets_and_content_types() {
    let server = TestServer::start();

    let reply = server.get("/app/main.js").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"export const x = 1;\n");
    assert_eq!(reply.header("content-type"), Some("application/javascript"));

    let reply = server.get("/styles.css?v=42").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("content-type"), Some("text/css"));

    let reply = server.get("/app").await;
    assert_eq!(reply.status, 301);
    assert_eq!(reply.header("location"), Some("/app/"));

    let reply = server.get("/app/").await;
    assert_eq!(reply.status, 200);
    assert!(String::from_utf8_lossy(&reply.body).contains("main.js"));

    server.stop().await;
}

#[tokio::test]
async fn test_traversal_variants_never_leak() {
    let server = TestServer::start();

    for path in [
        "/../secret.txt",
        "/../../secret.txt",
        "/app/../../secret.txt",
        "/%2e%2e/secret.txt",
        "/app/%2E%2E/%2E%2E/secret.txt",
    ] {
        let reply = server.get(path).await;
        assert!(
            reply.status == 403 || reply.status == 404,
            "{path} returned {}",
            reply.status
        );
        assert_ne!(reply.body, b"do not serve", "{path} leaked the file");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_methods() {
    let server = TestServer::start();

    for method in ["POST", "PUT", "DELETE"] {
        let reply = server
            .request(&format!(
                "{method} /index.html HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            ))
            .await;
        assert_eq!(reply.status, 405, "{method}");
        assert_eq!(reply.header("allow"), Some("GET, HEAD"));
    }

    let reply = server
        .request("HEAD /index.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.header("content-length"), Some("15"));
    assert!(reply.body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_sequential_connections_and_http10() {
    let server = TestServer::start();

    for _ in 0..5 {
        let reply = server.request("GET /index.html HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, b"<html>ok</html>");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_startup_errors() {
    let dir = tempfile::tempdir().unwrap();

    let err = Server::start(config(&dir.path().join("missing"), 0)).err().unwrap();
    assert!(matches!(err, ServerError::Config(_)));

    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let err = Server::start(config(dir.path(), port)).err().unwrap();
    assert!(matches!(err, ServerError::Bind { .. }));
}

#[tokio::test]
async fn test_redirect_never_leaves_host() {
    let server = TestServer::start();

    let reply = server.get("//app").await;
    assert_eq!(reply.status, 301);
    assert_eq!(reply.header("location"), Some("/app/"));

    server.stop().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_index_symlink_out_of_root_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("ui");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(dir.path().join("secret.txt"), "do not serve").unwrap();
    std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("index.html")).unwrap();

    let server = Server::start(config(&root, 0)).unwrap();
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    let task = tokio::spawn(server.run());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let reply = Reply::parse(&buf);
    assert_eq!(reply.status, 403);
    assert_ne!(reply.body, b"do not serve");

    shutdown.stop();
    task.await.unwrap().unwrap();
}
