//! HTTP-level tests for request validation, downloads and listings.

mod common;

use common::TestHarness;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Send a request line verbatim; HTTP clients would normalize `..` away.
async fn raw_get(addr: std::net::SocketAddr, target: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {target} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn url(addr: std::net::SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

#[tokio::test]
async fn health_check() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(url(addr, "/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::Client::new()
        .get(url(addr, "/health"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn tts_returns_not_implemented() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::Client::new()
        .post(url(addr, "/tts"))
        .json(&serde_json::json!({"text": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 501);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "not_implemented");
}

#[tokio::test]
async fn download_rejects_traversal() {
    let (_h, addr) = TestHarness::with_server().await;
    for name in ["..%2F..%2Fetc%2Fpasswd", "..%2Fsecret.silk", "a%5Cb.silk", "x%2Fy.silk"] {
        let resp = reqwest::get(url(addr, &format!("/download/{name}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{name}");
    }
}

#[tokio::test]
async fn download_rejects_raw_traversal_paths() {
    let (h, addr) = TestHarness::with_server().await;
    // A real file one level above the output directory.
    std::fs::write(h.root.path().join("secret.silk"), b"secret").unwrap();

    for target in [
        "/download/../../etc/passwd",
        "/download/../secret.silk",
        "/download/a/b.silk",
        "/download/..",
        "/download/a\\b.silk",
    ] {
        let response = raw_get(addr, target).await;
        assert!(
            response.starts_with("HTTP/1.1 400"),
            "{target}: {}",
            response.lines().next().unwrap_or_default()
        );
        assert!(!response.ends_with("secret"));
    }
}

#[tokio::test]
async fn download_unknown_is_not_found() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(url(addr, "/download/nope.silk")).await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn download_serves_existing_file() {
    let (h, addr) = TestHarness::with_server().await;
    std::fs::write(h.output_dir().join("ready.silk"), b"#!SILK_V3").unwrap();

    let resp = reqwest::get(url(addr, "/download/ready.silk")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("ready.silk"));
    assert_eq!(&resp.bytes().await.unwrap()[..], b"#!SILK_V3");
}

#[tokio::test]
async fn file_listing_reports_both_directories() {
    let (h, addr) = TestHarness::with_server().await;
    std::fs::write(h.upload_dir().join("b.wav"), b"1").unwrap();
    std::fs::write(h.upload_dir().join("a.wav"), b"1").unwrap();
    std::fs::write(h.output_dir().join("c.silk"), b"1").unwrap();

    let body: serde_json::Value = reqwest::get(url(addr, "/api/files"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    let uploads: Vec<&str> = body["uploads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(uploads, ["a.wav", "b.wav"]);
    assert_eq!(body["silk_files"][0]["name"], "c.silk");
    assert!(body["silk_files"][0]["time"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn url_without_field_is_bad_request() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::Client::new()
        .post(url(addr, "/url"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn url_with_file_scheme_is_rejected() {
    let (h, addr) = TestHarness::with_server().await;
    let resp = reqwest::Client::new()
        .post(url(addr, "/url"))
        .json(&serde_json::json!({"url": "file:///etc/passwd"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(common::list(h.upload_dir()).is_empty());
}

#[tokio::test]
async fn convert_rejects_unknown_content_type() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::Client::new()
        .post(url(addr, "/convert"))
        .header("content-type", "text/plain")
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "unsupported_input");
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let (_h, addr) = TestHarness::with_server().await;
    let form = reqwest::multipart::Form::new().text("other", "value");
    let resp = reqwest::Client::new()
        .post(url(addr, "/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn upload_with_missing_tools_fails_and_cleans_up() {
    let (h, addr) = TestHarness::with_server().await;
    let part = reqwest::multipart::Part::bytes(b"RIFF....".to_vec()).file_name("a.wav");
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = reqwest::Client::new()
        .post(url(addr, "/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "transcode_error");
    assert!(common::list(h.upload_dir()).is_empty());
    assert!(common::list(h.output_dir()).is_empty());
}

#[tokio::test]
async fn tools_endpoint_reports_missing_tools() {
    let (_h, addr) = TestHarness::with_server().await;
    let body: serde_json::Value = reqwest::get(url(addr, "/api/tools"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let tools = body.as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().all(|t| t["available"] == false));
}
