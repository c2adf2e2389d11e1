//! Tests for the HTTP surface: status codes, headers and JSON envelopes
//! produced by the axum router.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;

use huginn::cache::{CacheStore, MemoryStore};
use huginn::error::RenderError;
use huginn::server::http::inbound_request;
use huginn::server::{HttpState, build_router};
use huginn::types::{AccessDecision, RenderJob, RenderRequest, RequestContext, resolve};
use huginn::{AccessGate, Huginn, Renderer};

// ============================================================================
// Fakes
// ============================================================================

struct StubRenderer {
    ok: bool,
    jobs: Mutex<Vec<RenderJob>>,
}

impl StubRenderer {
    fn new(ok: bool) -> Arc<Self> {
        Arc::new(Self {
            ok,
            jobs: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(&self, job: RenderJob) -> Result<String, RenderError> {
        self.jobs.lock().unwrap().push(job);
        if self.ok {
            Ok("<html><body>rendered</body></html>".to_string())
        } else {
            Err(RenderError::Timeout(Duration::from_secs(30)))
        }
    }

    async fn probe(&self) -> Result<(), RenderError> {
        if self.ok {
            Ok(())
        } else {
            Err(RenderError::PoolUnavailable("down".into()))
        }
    }
}

/// Gate that records the context it was shown.
struct RecordingGate {
    decision: AccessDecision,
    seen: Mutex<Vec<RequestContext>>,
}

impl RecordingGate {
    fn new(decision: AccessDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl AccessGate for RecordingGate {
    fn name(&self) -> &str {
        "recording"
    }

    async fn check_and_maybe_issue_token(&self, ctx: &RequestContext) -> AccessDecision {
        self.seen.lock().unwrap().push(ctx.clone());
        self.decision.clone()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn router(
    renderer: Arc<StubRenderer>,
    gate: Arc<RecordingGate>,
    store: Arc<MemoryStore>,
) -> Router {
    let proxy = Huginn::builder()
        .renderer(renderer)
        .access_gate(gate)
        .cache_store(store)
        .version("1.2.3")
        .build()
        .unwrap();
    build_router(HttpState::new(Arc::new(proxy)).debug(true))
}

fn default_router() -> Router {
    router(
        StubRenderer::new(true),
        RecordingGate::new(AccessDecision::allow()),
        Arc::new(MemoryStore::new(10)),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

const EXAMPLE: &str = "/?destination=https%3A%2F%2Fexample.com";

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_reports_version() {
    let response = send(&default_router(), get("/")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "Browser cluster OK. v1.2.3");
}

#[tokio::test]
async fn unhealthy_pool_is_503() {
    let router = router(
        StubRenderer::new(false),
        RecordingGate::new(AccessDecision::allow()),
        Arc::new(MemoryStore::new(10)),
    );

    let response = send(&router, get("/")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"], "Browser cluster not ready");
}

// ============================================================================
// Proxying
// ============================================================================

#[test]
fn empty_destination_has_no_render_target() {
    let health = inbound_request(&get("/?destination="));
    assert_eq!(health.destination.as_deref(), Some(""));
    assert_eq!(health.target(), None);

    let page = inbound_request(&get(EXAMPLE));
    assert_eq!(page.target(), Some("https://example.com"));
}

#[tokio::test]
async fn miss_then_hit_headers() {
    let store = Arc::new(MemoryStore::new(10));
    let gate = RecordingGate::new(AccessDecision::allow());
    let router = router(StubRenderer::new(true), gate.clone(), store.clone());

    let miss = send(&router, get(EXAMPLE)).await;
    assert_eq!(miss.status(), StatusCode::OK);
    assert_eq!(header(&miss, "content-type"), Some("text/html"));
    assert_eq!(header(&miss, "access-control-allow-origin"), Some("*"));
    assert_eq!(header(&miss, "x-proxy-mode"), Some("browser"));
    assert_eq!(header(&miss, "x-cache-status"), Some("MISS"));
    assert!(header(&miss, "x-token").is_none());
    assert_eq!(text_body(miss).await, "<html><body>rendered</body></html>");

    let key = RenderRequest::new("https://example.com", resolve(None, None)).cache_key();
    for _ in 0..50 {
        if store.get(&key).await.unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let hit = send(&router, get(EXAMPLE)).await;
    assert_eq!(hit.status(), StatusCode::OK);
    assert_eq!(header(&hit, "x-proxy-mode"), Some("browser-cache"));
    assert_eq!(header(&hit, "x-cache-status"), Some("HIT"));
    assert_eq!(gate.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn query_and_headers_reach_the_orchestrator() {
    let renderer = StubRenderer::new(true);
    let gate = RecordingGate::new(AccessDecision::allow());
    let router = router(renderer.clone(), gate.clone(), Arc::new(MemoryStore::new(10)));

    let mut request = Request::builder()
        .uri("/?destination=https%3A%2F%2Fexample.com%2F%3Fa%3D1%26b%3D2&other=x")
        .header("x-browser-wait-until", "load")
        .header("x-browser-timeout", "1500")
        .header("x-token", "session-token")
        .body(Body::empty())
        .unwrap();
    let peer: SocketAddr = "198.51.100.4:50000".parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let jobs = renderer.jobs.lock().unwrap().clone();
    assert_eq!(jobs[0].url, "https://example.com/?a=1&b=2");
    assert_eq!(jobs[0].wait_until.as_str(), "load");
    assert_eq!(jobs[0].timeout_ms, 1500);

    let seen = gate.seen.lock().unwrap().clone();
    assert_eq!(seen[0].token.as_deref(), Some("session-token"));
    assert_eq!(seen[0].remote_addr, Some(peer.ip()));
}

#[tokio::test]
async fn rotated_token_is_exposed() {
    let router = router(
        StubRenderer::new(true),
        RecordingGate::new(AccessDecision::allow_with_token("fresh.token")),
        Arc::new(MemoryStore::new(10)),
    );

    let response = send(&router, get(EXAMPLE)).await;

    assert_eq!(header(&response, "x-token"), Some("fresh.token"));
    assert_eq!(
        header(&response, "access-control-expose-headers"),
        Some("X-Token")
    );
}

#[tokio::test]
async fn denied_is_401_with_generic_message() {
    let renderer = StubRenderer::new(true);
    let router = router(
        renderer.clone(),
        RecordingGate::new(AccessDecision::deny()),
        Arc::new(MemoryStore::new(10)),
    );

    let response = send(&router, get(EXAMPLE)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Invalid or missing token");
    assert!(renderer.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn render_failure_is_504() {
    let router = router(
        StubRenderer::new(false),
        RecordingGate::new(AccessDecision::allow()),
        Arc::new(MemoryStore::new(10)),
    );

    let response = send(&router, get(EXAMPLE)).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "Browser cluster failed or timed out" })
    );
}

// ============================================================================
// Methods and routes
// ============================================================================

#[tokio::test]
async fn cors_preflight_is_204() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = send(&default_router(), request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
    assert_eq!(header(&response, "access-control-allow-methods"), Some("*"));
    assert_eq!(header(&response, "access-control-allow-headers"), Some("*"));
    assert!(text_body(response).await.is_empty());
}

#[tokio::test]
async fn bare_options_is_405() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = send(&default_router(), request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(response).await["error"], "Method Not Allowed");
}

#[tokio::test]
async fn post_is_405() {
    let request = Request::builder()
        .method(Method::POST)
        .uri(EXAMPLE)
        .body(Body::empty())
        .unwrap();

    let response = send(&default_router(), request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn head_is_served() {
    let request = Request::builder()
        .method(Method::HEAD)
        .uri(EXAMPLE)
        .body(Body::empty())
        .unwrap();

    let response = send(&default_router(), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-cache-status"), Some("MISS"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let response = send(&default_router(), get("/elsewhere")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Not Found");
}
