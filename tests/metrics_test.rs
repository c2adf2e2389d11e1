//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use huginn::cache::{CacheKey, CacheStore, MemoryStore};
use huginn::error::{CacheError, RenderError};
use huginn::render::{EngineLauncher, PoolConfig, RenderEngine, Renderer, RendererPool};
use huginn::telemetry;
use huginn::types::{AccessDecision, RenderJob, RequestContext, WaitUntil};
use huginn::{AccessGate, Huginn, InboundRequest, RenderProxy};

// ============================================================================
// Fakes
// ============================================================================

struct EchoEngine;

#[async_trait]
impl RenderEngine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    async fn render(&self, job: &RenderJob) -> Result<String, RenderError> {
        if job.url.starts_with("fail://") {
            return Err(RenderError::Navigation("refused".into()));
        }
        Ok(format!("<html>{}</html>", job.url))
    }
}

struct EchoLauncher;

#[async_trait]
impl EngineLauncher for EchoLauncher {
    async fn launch(&self) -> Result<Arc<dyn RenderEngine>, RenderError> {
        Ok(Arc::new(EchoEngine))
    }
}

struct DenyAll;

#[async_trait]
impl AccessGate for DenyAll {
    fn name(&self) -> &str {
        "deny"
    }

    async fn check_and_maybe_issue_token(&self, _ctx: &RequestContext) -> AccessDecision {
        AccessDecision::deny()
    }
}

struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self, _key: &CacheKey) -> Result<Option<String>, CacheError> {
        Err(CacheError::backend("broken", "timeout"))
    }

    async fn set(&self, _key: &CacheKey, _markup: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::backend("broken", "timeout"))
    }
}

fn pool() -> Arc<RendererPool> {
    Arc::new(RendererPool::new(Arc::new(EchoLauncher), PoolConfig::default()))
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counter values for `name` carrying label `label = value`.
fn labelled_total(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Run `proxy` over `requests` inside a local recorder scope.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn record(proxy: &RenderProxy, requests: Vec<InboundRequest>) -> SnapshotVec {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                for request in requests {
                    proxy.handle(request).await;
                }
            })
        })
    });

    snapshotter.snapshot().into_vec()
}

fn request(destination: &str) -> InboundRequest {
    InboundRequest::new().destination(destination)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn render_then_hit_records_metrics() {
    let store = Arc::new(MemoryStore::new(10));
    let proxy = Huginn::builder()
        .renderer(pool())
        .cache_store(store.clone())
        .build()
        .unwrap();

    // Pre-populate so the second destination is a hit.
    let hit_key = huginn::RenderRequest::new("https://cached.com", huginn::resolve(None, None))
        .cache_key();
    store
        .set(&hit_key, "<html>cached</html>", Duration::from_secs(60))
        .await
        .unwrap();

    let snapshot = record(
        &proxy,
        vec![request("https://example.com"), request("https://cached.com")],
    );

    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 2);
    assert_eq!(
        labelled_total(&snapshot, telemetry::REQUESTS_TOTAL, "outcome", "rendered"),
        1
    );
    assert_eq!(
        labelled_total(&snapshot, telemetry::REQUESTS_TOTAL, "outcome", "cache_hit"),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(
        labelled_total(&snapshot, telemetry::RENDERS_TOTAL, "status", "ok"),
        1
    );
    assert!(
        has_histogram(&snapshot, telemetry::RENDER_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failures_record_their_kind() {
    let proxy = Huginn::builder()
        .renderer(pool())
        .cache_store(Arc::new(BrokenStore))
        .build()
        .unwrap();

    let snapshot = record(&proxy, vec![request("fail://nowhere")]);

    assert_eq!(
        labelled_total(&snapshot, telemetry::CACHE_ERRORS_TOTAL, "operation", "get"),
        1
    );
    assert_eq!(
        labelled_total(&snapshot, telemetry::RENDERS_TOTAL, "status", "navigation"),
        1
    );
    assert_eq!(
        labelled_total(&snapshot, telemetry::REQUESTS_TOTAL, "outcome", "render_failed"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn denied_requests_are_counted() {
    let proxy = Huginn::builder()
        .renderer(pool())
        .access_gate(Arc::new(DenyAll))
        .build()
        .unwrap();

    let snapshot = record(&proxy, vec![request("https://example.com")]);

    assert_eq!(counter_total(&snapshot, telemetry::ACCESS_DENIED_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::RENDERS_TOTAL), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn unsupported_wait_condition_is_labelled() {
    let pool = pool();

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(pool.render(RenderJob::new(
                "https://example.com",
                WaitUntil::parse("networkidle9"),
                1000,
            )))
        })
    });
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        labelled_total(
            &snapshot,
            telemetry::RENDERS_TOTAL,
            "status",
            "unsupported_wait_condition"
        ),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let proxy = Huginn::builder().renderer(pool()).build().unwrap();
    let _outcome = proxy.handle(request("https://example.com")).await;
}
