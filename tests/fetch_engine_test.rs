//! Tests for the HTTP-fetching render engine, driven through the pool
//! against a mock destination.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use huginn::error::RenderError;
use huginn::render::{
    BLANK_DOCUMENT, FetchEngine, FetchLauncher, PoolConfig, RenderEngine, Renderer, RendererPool,
};
use huginn::types::{RenderJob, WaitUntil};

fn pool() -> RendererPool {
    RendererPool::new(Arc::new(FetchLauncher::new("huginn-test")), PoolConfig::default())
}

fn job(url: String, timeout_ms: u64) -> RenderJob {
    RenderJob::new(url, WaitUntil::NetworkIdle2, timeout_ms)
}

#[tokio::test]
async fn fetches_destination_markup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", "huginn-test"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>hello</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let markup = pool()
        .render(job(format!("{}/page", server.uri()), 5000))
        .await
        .unwrap();

    assert_eq!(markup, "<html><body>hello</body></html>");
}

#[tokio::test]
async fn error_status_still_returns_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>gone</html>"))
        .mount(&server)
        .await;

    let markup = pool()
        .render(job(format!("{}/missing", server.uri()), 5000))
        .await
        .unwrap();

    assert_eq!(markup, "<html>gone</html>");
}

#[tokio::test]
async fn slow_destination_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let result = pool().render(job(format!("{}/slow", server.uri()), 100)).await;

    assert!(matches!(result, Err(RenderError::Timeout(_))), "{result:?}");
}

#[tokio::test]
async fn unreachable_destination_is_navigation_error() {
    // Port 9 (discard) on loopback is not listening in test environments.
    let result = pool()
        .render(job("http://127.0.0.1:9/".to_string(), 5000))
        .await;

    assert!(matches!(result, Err(RenderError::Navigation(_))), "{result:?}");
}

#[tokio::test]
async fn blank_page_needs_no_network() {
    let engine = FetchEngine::new(reqwest::Client::new());

    let markup = engine.render(&RenderJob::probe()).await.unwrap();

    assert_eq!(markup, BLANK_DOCUMENT);
    assert!(pool().probe().await.is_ok());
}
