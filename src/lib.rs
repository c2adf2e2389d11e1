//! Huginn - render-caching proxy gateway
//!
//! Serves the fully rendered markup of a destination URL. Renders run on a
//! concurrency-bounded [`RendererPool`]; successful results are cached for a
//! fixed TTL and served to later identical requests without touching the
//! pool or the access gate.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use huginn::{FetchLauncher, Huginn, InboundRequest, Outcome, PoolConfig, RendererPool};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let pool = Arc::new(RendererPool::new(
//!         Arc::new(FetchLauncher::default()),
//!         PoolConfig::default(),
//!     ));
//!
//!     let proxy = Huginn::builder().renderer(pool.clone()).build()?;
//!
//!     let outcome = proxy
//!         .handle(InboundRequest::new().destination("https://example.com"))
//!         .await;
//!     if let Outcome::Rendered { markup, .. } = outcome {
//!         println!("{markup}");
//!     }
//!
//!     pool.close().await;
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod cache;
pub mod error;
pub mod gateway;
pub mod render;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{CacheError, HuginnError, RenderError, Result, TokenError};
pub use gateway::{Huginn, HuginnBuilder, InboundRequest, Outcome, RenderProxy};
pub use version::{PKG_VERSION, version_string};

pub use access::{AccessGate, ChallengeVerifier, OpenGate, TokenGate, TokenSigner};
pub use cache::{CacheConfig, CacheKey, CacheStore, Lookup, MemoryStore, ResponseCache};
#[cfg(feature = "redis")]
pub use cache::RedisStore;
pub use render::{
    EngineLauncher, FetchEngine, FetchLauncher, PoolConfig, RenderEngine, Renderer, RendererPool,
};

pub use types::{
    AccessDecision, RenderJob, RenderOptions, RenderRequest, RequestContext, WaitUntil, resolve,
};
