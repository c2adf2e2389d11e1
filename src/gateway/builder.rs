//! Builder for configuring gateway instances

use std::sync::Arc;

use super::RenderProxy;
use crate::access::{AccessGate, OpenGate};
use crate::cache::{CacheConfig, CacheStore, MemoryStore, ResponseCache};
use crate::render::Renderer;
use crate::{HuginnError, PKG_VERSION, Result};

/// Main entry point for creating gateway instances.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring gateway instances.
///
/// A renderer is required. Without a cache store an in-memory store sized
/// by [`CacheConfig`] is used; without an access gate every cache miss is
/// admitted ([`OpenGate`]).
pub struct HuginnBuilder {
    renderer: Option<Arc<dyn Renderer>>,
    store: Option<Arc<dyn CacheStore>>,
    cache_config: CacheConfig,
    gate: Option<Arc<dyn AccessGate>>,
    version: Option<String>,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            renderer: None,
            store: None,
            cache_config: CacheConfig::default(),
            gate: None,
            version: None,
        }
    }

    /// Set the renderer jobs are submitted to (usually a [`RendererPool`](crate::RendererPool)).
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Use a specific cache backend.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set cache TTL, store call timeout and in-memory capacity.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Gate cache misses behind `gate`.
    pub fn access_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Version reported by the health probe. Defaults to the package version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn build(self) -> Result<RenderProxy> {
        let renderer = self.renderer.ok_or(HuginnError::NoRenderer)?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new(self.cache_config.max_entries)));
        let cache = ResponseCache::with_config(store, &self.cache_config);
        let gate = self.gate.unwrap_or_else(|| Arc::new(OpenGate));
        let version = self.version.unwrap_or_else(|| PKG_VERSION.to_string());

        Ok(RenderProxy::new(renderer, cache, gate, version))
    }
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
