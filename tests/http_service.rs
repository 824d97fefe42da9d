//! End-to-end tests against a live listener.
//!
//! Archive round-trips need the `zip` binary; those tests skip themselves
//! with a note when it is missing. Everything else runs self-contained.

use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use zipserve::config::Config;
use zipserve::{Router, Server, handlers};

fn zip_available() -> bool {
    std::process::Command::new("zip")
        .arg("-v")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

fn write_pages(dir: &Path) -> (PathBuf, PathBuf) {
    let index = dir.join("index.html");
    let error = dir.join("404.html");
    std::fs::write(&index, "<h1>downloads</h1>").unwrap();
    std::fs::write(&error, "<h1>no such archive</h1>").unwrap();
    (index, error)
}

fn base_config(root: &Path, pages: &Path) -> Config {
    let (index_page, error_page) = write_pages(pages);
    Config {
        data_root: root.to_owned(),
        addr: "127.0.0.1:0".into(),
        chunk_size: zipserve::archive::DEFAULT_CHUNK_SIZE,
        chunk_gap: Duration::ZERO,
        index_page,
        error_page,
    }
}

/// Binds an ephemeral port, serves `config`'s routes on it in a background
/// task, and returns the bound address.
async fn serve_app(config: Config) -> SocketAddr {
    let config = Arc::new(config);
    let router = Router::new()
        .get("/", handlers::index(Arc::clone(&config)))
        .get("/archive/{archive_hash}/", handlers::archive(config));

    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve(router));
    addr
}

/// Sends one GET with an unnormalized request target. reqwest's URL layer
/// collapses dot segments (even percent-encoded ones) before sending, so
/// hostile-path tests have to speak to the socket directly.
async fn raw_get(addr: SocketAddr, target: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {target} HTTP/1.1\r\nhost: {addr}\r\nconnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Deterministic pseudo-random bytes. Poorly compressible, so archived
/// fixtures keep roughly their original size on the wire.
fn pattern_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            (state >> 16) as u8
        })
        .collect()
}

#[tokio::test]
async fn serves_the_index_page() {
    let root = tempfile::tempdir().unwrap();
    let pages = tempfile::tempdir().unwrap();
    let addr = serve_app(base_config(root.path(), pages.path())).await;

    let res = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/html; charset=utf-8");
    assert!(res.text().await.unwrap().contains("<h1>downloads</h1>"));
}

#[tokio::test]
async fn unknown_archive_gets_the_rendered_error_page() {
    let root = tempfile::tempdir().unwrap();
    let pages = tempfile::tempdir().unwrap();
    let addr = serve_app(base_config(root.path(), pages.path())).await;

    let res = reqwest::get(format!("http://{addr}/archive/doesnotexist/")).await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["content-type"], "text/html; charset=utf-8");
    assert!(res.text().await.unwrap().contains("no such archive"));
}

#[tokio::test]
async fn missing_error_page_falls_back_to_plain_text() {
    let root = tempfile::tempdir().unwrap();
    let pages = tempfile::tempdir().unwrap();
    let mut config = base_config(root.path(), pages.path());
    config.error_page = pages.path().join("deleted.html");
    let addr = serve_app(config).await;

    let res = reqwest::get(format!("http://{addr}/archive/doesnotexist/")).await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(res.text().await.unwrap(), "archive not found");
}

#[tokio::test]
async fn unknown_route_is_a_bare_404() {
    let root = tempfile::tempdir().unwrap();
    let pages = tempfile::tempdir().unwrap();
    let addr = serve_app(base_config(root.path(), pages.path())).await;

    for target in ["/nope", "/archive/abc123", "/archive/abc123/extra/"] {
        let res = reqwest::get(format!("http://{addr}{target}")).await.unwrap();
        assert_eq!(res.status(), 404, "target {target}");
        assert!(res.bytes().await.unwrap().is_empty(), "target {target}");
    }
}

#[tokio::test]
async fn traversal_paths_get_the_error_page_not_a_listing() {
    let root = tempfile::tempdir().unwrap();
    tokio::fs::write(root.path().join("secret.txt"), b"outside any archive").await.unwrap();
    let pages = tempfile::tempdir().unwrap();
    let addr = serve_app(base_config(root.path(), pages.path())).await;

    for target in ["/archive/../", "/archive/%2E%2E/"] {
        let response = raw_get(addr, target).await;
        assert!(response.starts_with("HTTP/1.1 404"), "target {target}: {response}");
        assert!(response.contains("no such archive"), "target {target}");
    }
}

#[tokio::test]
async fn streams_a_real_archive_round_trip() {
    if !zip_available() {
        eprintln!("zip binary not found, skipping");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("abc123");
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    let photo_a = pattern_bytes(10 * 1024, 3);
    let photo_b = pattern_bytes(5 * 1024, 7);
    std::fs::write(dir.join("a.jpg"), &photo_a).unwrap();
    std::fs::write(dir.join("b.jpg"), &photo_b).unwrap();
    std::fs::write(dir.join("sub").join("c.txt"), b"nested file").unwrap();

    let pages = tempfile::tempdir().unwrap();
    let addr = serve_app(base_config(root.path(), pages.path())).await;

    let res = reqwest::get(format!("http://{addr}/archive/abc123/")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/zip");
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename=\"abc123.zip\""
    );

    let body = res.bytes().await.unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();

    let mut read_entry = |name: &str| -> Vec<u8> {
        let mut entry = archive.by_name(name).unwrap_or_else(|_| panic!("entry {name}"));
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        contents
    };
    assert_eq!(read_entry("a.jpg"), photo_a);
    assert_eq!(read_entry("b.jpg"), photo_b);
    assert_eq!(read_entry("sub/c.txt"), b"nested file");
}

#[tokio::test]
async fn empty_directory_streams_an_empty_archive() {
    if !zip_available() {
        eprintln!("zip binary not found, skipping");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("empty")).unwrap();
    let pages = tempfile::tempdir().unwrap();
    let addr = serve_app(base_config(root.path(), pages.path())).await;

    // Headers go out before the compressor runs, so this is a 200 even
    // though `zip` has nothing to archive and produces no output.
    let res = reqwest::get(format!("http://{addr}/archive/empty/")).await.unwrap();
    assert_eq!(res.status(), 200);

    let body = res.bytes().await.unwrap();
    if !body.is_empty() {
        let archive = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();
        assert_eq!(archive.len(), 0);
    }
}

#[tokio::test]
async fn disconnect_mid_download_keeps_the_server_healthy() {
    if !zip_available() {
        eprintln!("zip binary not found, skipping");
        return;
    }

    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("big");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join("blob.bin"), pattern_bytes(64 * 1024, 11)).unwrap();

    let pages = tempfile::tempdir().unwrap();
    let mut config = base_config(root.path(), pages.path());
    // Small paced chunks keep the download alive long enough to abandon it.
    config.chunk_size = 1024;
    config.chunk_gap = Duration::from_millis(20);
    let addr = serve_app(config).await;

    let mut res = reqwest::get(format!("http://{addr}/archive/big/")).await.unwrap();
    assert_eq!(res.status(), 200);
    let first = res.chunk().await.unwrap();
    assert!(first.is_some(), "download starts streaming");
    drop(res);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(res.status(), 200, "server still answers after an abandoned download");
}
