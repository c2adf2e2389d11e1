//! Renderer seams.
//!
//! Three layers, each replaceable on its own:
//!
//! - [`Renderer`]: what the gateway calls (`render` / `probe`).
//!   [`RendererPool`](super::RendererPool) implements it; tests substitute fakes.
//! - [`RenderEngine`]: one launched rendering backend (a browser, a fetcher)
//!   that can serve many jobs concurrently. The pool bounds concurrency and
//!   enforces timeouts, so engines need do neither.
//! - [`EngineLauncher`]: creates the engine on the pool's first use.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::types::RenderJob;

/// Render submission as seen by the gateway.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Run one job to completion and return the captured markup.
    async fn render(&self, job: RenderJob) -> Result<String, RenderError>;

    /// Minimal navigation proving the renderer can serve jobs.
    async fn probe(&self) -> Result<(), RenderError>;
}

/// A launched rendering backend.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Engine name for logging/debugging.
    fn name(&self) -> &str;

    /// Navigate to `job.url`, wait for `job.wait_until`, return the document markup.
    ///
    /// Only called with supported wait conditions.
    async fn render(&self, job: &RenderJob) -> Result<String, RenderError>;

    /// Release engine resources. Called once by the pool on close.
    async fn close(&self) {}
}

/// Factory for the pool's engine.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn RenderEngine>, RenderError>;
}
