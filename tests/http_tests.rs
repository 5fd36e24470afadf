//! Static fetcher and HTTP probe against a local mock server.

use httpmock::prelude::*;
use link_preview::{Fetcher, HttpProbe, PageSource, PreviewError, ResourceProbe};
use std::time::Duration;
use tokio::net::TcpListener;

// Loopback only; ignore any proxy configured in the environment.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn fetcher() -> Fetcher {
    Fetcher::with_client(client())
}

fn probe() -> HttpProbe {
    HttpProbe::with_client(client())
}

#[tokio::test]
async fn fetcher_returns_body_for_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><head><title>Loopback</title></head></html>");
        })
        .await;

    let fetcher = fetcher();
    let result = PageSource::fetch(&fetcher, &server.url("/")).await.unwrap();
    mock.assert_async().await;

    assert!(result.html.contains("<title>Loopback</title>"));
    assert_eq!(result.final_url, server.url("/"));
}

#[tokio::test]
async fn fetcher_treats_non_success_as_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone");
            then.status(410).header("content-type", "text/html").body("gone");
        })
        .await;

    let fetcher = fetcher();
    let result = PageSource::fetch(&fetcher, &server.url("/gone")).await;
    assert!(matches!(result, Err(PreviewError::FetchFailure(_))));
}

#[tokio::test]
async fn fetcher_rejects_body_over_content_limit() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/large");
            then.status(200)
                .header("content-type", "text/html")
                .body("x".repeat(4096));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/small");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html></html>");
        })
        .await;

    let fetcher = fetcher().with_max_content_size(1024);

    let err = PageSource::fetch(&fetcher, &server.url("/large"))
        .await
        .unwrap_err();
    assert!(matches!(err, PreviewError::FetchFailure(ref msg) if msg.contains("1024 byte")));

    let ok = PageSource::fetch(&fetcher, &server.url("/small")).await.unwrap();
    assert_eq!(ok.html, "<html></html>");
}

#[tokio::test]
async fn image_probe_requires_image_content_type() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/logo.png");
            then.status(200).header("content-type", "image/png").body("png-bytes");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/page.html");
            then.status(200).header("content-type", "text/html").body("<html></html>");
        })
        .await;

    let probe = probe();
    assert!(probe.is_reachable_image(&server.url("/logo.png")).await);
    assert!(!probe.is_reachable_image(&server.url("/page.html")).await);
    // unmatched paths answer 404
    assert!(!probe.is_reachable_image(&server.url("/img/logo.png")).await);
}

#[tokio::test]
async fn url_probe_accepts_any_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/page.html");
            then.status(200).header("content-type", "text/html").body("<html></html>");
        })
        .await;

    let probe = probe();
    assert!(probe.is_reachable_url(&server.url("/page.html")).await);
    assert!(!probe.is_reachable_url(&server.url("/missing")).await);
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn probe_on_closed_port_is_false_not_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let probe = probe();
    assert!(!probe.is_reachable_image(&format!("http://{addr}/favicon.ico")).await);
}
