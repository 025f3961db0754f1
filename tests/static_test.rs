//! Static file fallback tests, driven through the router with `oneshot`.

#![cfg(unix)]

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::TestHarness;
use hlsforge::server::create_router;
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn get(harness: &TestHarness, path: &str) -> axum::response::Response {
    create_router(harness.ctx.clone())
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn content_type(response: &axum::response::Response) -> &str {
    response.headers()[header::CONTENT_TYPE].to_str().unwrap()
}

#[tokio::test]
async fn test_serves_transcode_output() {
    let harness = TestHarness::new();
    harness.ctx.transcoder.run().await.unwrap();

    let response = get(&harness, "/output/master.m3u8").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "application/vnd.apple.mpegurl");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes, harness.manifest().as_bytes());

    let response = get(&harness, "/output/720p/file_000.ts").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "video/MP2T");
}

#[tokio::test]
async fn test_content_type_by_extension() {
    let harness = TestHarness::new();
    for (name, expected) in [
        ("index.html", "text/html"),
        ("app.js", "application/javascript"),
        ("style.css", "text/css"),
        ("notes.txt", "application/octet-stream"),
    ] {
        std::fs::write(harness.root().join(name), b"x").unwrap();
        let response = get(&harness, &format!("/{name}")).await;
        assert_eq!(response.status(), StatusCode::OK, "{name}");
        assert_eq!(content_type(&response), expected, "{name}");
    }
}

#[tokio::test]
async fn test_root_serves_index() {
    let harness = TestHarness::new();

    let response = get(&harness, "/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    std::fs::write(harness.root().join("index.html"), b"<html></html>").unwrap();
    let response = get(&harness, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "text/html");
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let harness = TestHarness::new();
    let response = get(&harness, "/output/master.m3u8").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_traversal_is_404() {
    let harness = TestHarness::new();

    let response = get(&harness, "/../etc/passwd").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Parent segments are refused even when they would stay inside the root.
    let response = get(&harness, "/output/../input/input.mp4").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&harness, "/input/input.mp4").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_non_get_is_405() {
    let harness = TestHarness::new();
    std::fs::write(harness.root().join("index.html"), b"x").unwrap();

    let response = create_router(harness.ctx.clone())
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
