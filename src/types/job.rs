//! Render requests and the jobs submitted to the renderer pool.

use std::time::Duration;

use super::options::{RenderOptions, WaitUntil};
use crate::cache::CacheKey;

/// Destination rendered by the pool's liveness probe.
pub const PROBE_URL: &str = "about:blank";

/// Fixed navigation timeout of the liveness probe.
pub const PROBE_TIMEOUT_MS: u64 = 5_000;

/// One inbound request for rendered markup. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    destination: String,
    options: RenderOptions,
}

impl RenderRequest {
    pub fn new(destination: impl Into<String>, options: RenderOptions) -> Self {
        Self {
            destination: destination.into(),
            options,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Cache identity of this request: destination, raw wait condition and raw timeout.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::derive(
            &self.destination,
            self.options.wait_until.as_str(),
            &self.options.timeout_raw,
        )
    }

    /// The job to hand to the renderer pool.
    pub fn job(&self) -> RenderJob {
        RenderJob {
            url: self.destination.clone(),
            wait_until: self.options.wait_until.clone(),
            timeout_ms: self.options.timeout_ms,
        }
    }
}

/// A single navigate-wait-capture unit of work.
///
/// Consumed exactly once by the pool; never retried by the gateway.
/// A `timeout_ms` of zero disables the per-job timeout, leaving only the
/// pool's task ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub url: String,
    pub wait_until: WaitUntil,
    pub timeout_ms: u64,
}

impl RenderJob {
    pub fn new(url: impl Into<String>, wait_until: WaitUntil, timeout_ms: u64) -> Self {
        Self {
            url: url.into(),
            wait_until,
            timeout_ms,
        }
    }

    /// Minimal navigation used to check pool liveness.
    pub fn probe() -> Self {
        Self::new(PROBE_URL, WaitUntil::DomContentLoaded, PROBE_TIMEOUT_MS)
    }

    /// The per-job timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}
