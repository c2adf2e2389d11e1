//! Telemetry metric name constants and log subscriber setup.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `outcome`: terminal request state (e.g. "cache_hit", "denied")
//! - `status`: render result, "ok" or an error kind ("timeout", ...)
//! - `operation`: cache operation: "get" or "set"

/// Total requests handled, by terminal state.
///
/// Labels: `outcome`.
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// Total cache hits.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total cache misses (not counting backend errors).
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total cache backend errors absorbed by the gateway.
///
/// Labels: `operation` ("get" | "set").
pub const CACHE_ERRORS_TOTAL: &str = "huginn_cache_errors_total";

/// Total render jobs executed by the pool.
///
/// Labels: `status` ("ok" | error kind).
pub const RENDERS_TOTAL: &str = "huginn_renders_total";

/// Render job duration in seconds, including queueing for a pool slot.
pub const RENDER_DURATION_SECONDS: &str = "huginn_render_duration_seconds";

/// Total cache misses turned away by the access gate.
pub const ACCESS_DENIED_TOTAL: &str = "huginn_access_denied_total";

#[cfg(feature = "server")]
pub use self::subscriber::init;

#[cfg(feature = "server")]
mod subscriber {
    use tracing_subscriber::{
        EnvFilter, fmt,
        layer::{Layer, SubscriberExt},
        util::SubscriberInitExt,
    };

    use crate::server::config::{LogFormat, LoggingConfig};
    use crate::{HuginnError, Result};

    /// Install a global tracing subscriber using the provided logging settings.
    ///
    /// `RUST_LOG` overrides the configured level.
    pub fn init(logging: &LoggingConfig) -> Result<()> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(logging.level.into())
            .from_env_lossy();

        let fmt_layer = match logging.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .boxed(),
            LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|err| {
                HuginnError::Configuration(format!("failed to install tracing subscriber: {err}"))
            })
    }
}
