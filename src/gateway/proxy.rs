//! Request orchestration: the render-caching proxy state machine.
//!
//! ```text
//! no destination ─► probe ─► Healthy | Unhealthy
//! destination ─► resolve options ─► cache lookup
//!     hit  ─► CacheHit                      (access gate not consulted)
//!     miss ─► access gate
//!         deny  ─► Denied
//!         allow ─► render
//!             ok   ─► write back (detached, best-effort) ─► Rendered
//!             fail ─► RenderFailed          (nothing written)
//! ```
//!
//! Each request walks the machine once, strictly in order. Distinct
//! requests run concurrently and share nothing but the renderer, the
//! cache and the gate. Concurrent misses for one key each render and each
//! write back; the last write wins.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::access::AccessGate;
use crate::cache::{CacheKey, Lookup, ResponseCache};
use crate::render::Renderer;
use crate::telemetry;
use crate::types::{RenderRequest, RequestContext, resolve};

/// Transport-independent view of one inbound request.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// `destination` query parameter. Absent or empty selects the health probe.
    pub destination: Option<String>,
    /// Raw `x-browser-wait-until` header.
    pub wait_until: Option<String>,
    /// Raw `x-browser-timeout` header.
    pub timeout: Option<String>,
    pub context: RequestContext,
}

impl InboundRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn wait_until(mut self, wait_until: impl Into<String>) -> Self {
        self.wait_until = Some(wait_until.into());
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// The page to render. An empty destination counts as absent.
    pub fn target(&self) -> Option<&str> {
        self.destination.as_deref().filter(|d| !d.is_empty())
    }
}

/// Terminal state of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Health probe succeeded.
    Healthy { status: String },
    /// Health probe failed.
    Unhealthy,
    /// Served from cache.
    CacheHit { markup: String },
    /// Cache miss turned away by the access gate.
    Denied,
    /// Freshly rendered, with the gate's rotated token if any.
    Rendered {
        markup: String,
        token: Option<String>,
    },
    /// Render failed or timed out.
    RenderFailed,
}

impl Outcome {
    /// HTTP status code for this outcome.
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Healthy { .. } | Outcome::CacheHit { .. } | Outcome::Rendered { .. } => 200,
            Outcome::Unhealthy => 503,
            Outcome::Denied => 401,
            Outcome::RenderFailed => 504,
        }
    }

    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Healthy { .. } => "healthy",
            Outcome::Unhealthy => "unhealthy",
            Outcome::CacheHit { .. } => "cache_hit",
            Outcome::Denied => "denied",
            Outcome::Rendered { .. } => "rendered",
            Outcome::RenderFailed => "render_failed",
        }
    }
}

/// The request orchestrator.
///
/// Built with [`Huginn::builder()`](crate::Huginn::builder). Owns handles to
/// its collaborators; the renderer's lifecycle stays with whoever built it.
pub struct RenderProxy {
    renderer: Arc<dyn Renderer>,
    cache: ResponseCache,
    gate: Arc<dyn AccessGate>,
    version: String,
}

impl RenderProxy {
    pub(crate) fn new(
        renderer: Arc<dyn Renderer>,
        cache: ResponseCache,
        gate: Arc<dyn AccessGate>,
        version: String,
    ) -> Self {
        Self {
            renderer,
            cache,
            gate,
            version,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Drive one request to its terminal state.
    pub async fn handle(&self, request: InboundRequest) -> Outcome {
        let InboundRequest {
            destination,
            wait_until,
            timeout,
            context,
        } = request;

        let outcome = match destination.filter(|d| !d.is_empty()) {
            None => self.health().await,
            Some(destination) => {
                let options = resolve(wait_until.as_deref(), timeout.as_deref());
                self.proxy(RenderRequest::new(destination, options), &context)
                    .await
            }
        };

        metrics::counter!(telemetry::REQUESTS_TOTAL, "outcome" => outcome.label()).increment(1);
        outcome
    }

    /// Probe the renderer with a blank page.
    pub async fn health(&self) -> Outcome {
        match self.renderer.probe().await {
            Ok(()) => Outcome::Healthy {
                status: format!("Browser cluster OK. v{}", self.version),
            },
            Err(err) => {
                error!(error = %err, "health check failed");
                Outcome::Unhealthy
            }
        }
    }

    async fn proxy(&self, request: RenderRequest, context: &RequestContext) -> Outcome {
        let key = request.cache_key();

        match self.cache.get(&key).await {
            Lookup::Hit(markup) => {
                debug!(destination = request.destination(), key = %key, "cache hit");
                return Outcome::CacheHit { markup };
            }
            Lookup::Miss => {}
            Lookup::Unavailable(err) => {
                warn!(key = %key, error = %err, "cache lookup failed, treating as miss");
            }
        }

        let decision = self.gate.check_and_maybe_issue_token(context).await;
        if !decision.allowed {
            metrics::counter!(telemetry::ACCESS_DENIED_TOTAL).increment(1);
            debug!(destination = request.destination(), gate = self.gate.name(), "access denied");
            return Outcome::Denied;
        }

        match self.renderer.render(request.job()).await {
            Ok(markup) => {
                self.write_back(key, markup.clone());
                Outcome::Rendered {
                    markup,
                    token: decision.rotated_token,
                }
            }
            Err(err) => {
                error!(destination = request.destination(), error = %err, "render failed");
                Outcome::RenderFailed
            }
        }
    }

    /// Store a successful render without holding up the response.
    fn write_back(&self, key: CacheKey, markup: String) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            if let Err(err) = cache.set(&key, &markup).await {
                warn!(key = %key, error = %err, "cache write failed, response unaffected");
            }
        });
    }
}
