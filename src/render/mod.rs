//! Rendering: the gateway-facing [`Renderer`] seam, the bounded
//! [`RendererPool`], and the default [`FetchEngine`].

pub mod fetch;
pub mod pool;
pub mod traits;

pub use fetch::{BLANK_DOCUMENT, FetchEngine, FetchLauncher};
pub use pool::{DEFAULT_MAX_CONCURRENCY, DEFAULT_TASK_TIMEOUT, PoolConfig, RendererPool};
pub use traits::{EngineLauncher, RenderEngine, Renderer};
