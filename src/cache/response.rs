//! Best-effort response cache in front of a [`CacheStore`].
//!
//! [`ResponseCache`] is the gateway's only view of the cache. Backend
//! failures come back as values, never as request errors:
//!
//! - [`ResponseCache::get`] returns [`Lookup::Unavailable`], which the
//!   orchestrator treats exactly like [`Lookup::Miss`] after logging it.
//! - [`ResponseCache::set`] returns the [`CacheError`]; the orchestrator
//!   runs it off the response path and only logs the outcome.
//!
//! Every store call is bounded by [`CacheConfig::operation_timeout`]; a
//! backend that stops answering fails the call the same way a refused
//! connection does. With the backend down or stalled the gateway therefore
//! behaves as if it had no cache at all.
//!
//! # Coalescing
//!
//! There is no single-flight layer. Two concurrent misses for one key both
//! render and both write; the later write wins. Adding coalescing means a
//! registry of in-flight renders keyed by [`CacheKey`] in the orchestrator,
//! not a change here.

use std::sync::Arc;
use std::time::Duration;

use super::{CacheKey, CacheStore, MemoryStore};
use crate::error::CacheError;
use crate::telemetry;

const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for the response cache.
///
/// ```rust
/// # use huginn::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .ttl(Duration::from_secs(600))
///     .operation_timeout(Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries for the in-memory store. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live of every written entry. Default: 300 seconds.
    pub ttl: Duration,
    /// Upper bound on a single store read or write. Default: 1 second.
    pub operation_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(300),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of in-memory entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for written entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set how long a store read or write may take before it counts as failed.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// Result of a cache lookup.
#[derive(Debug)]
pub enum Lookup {
    Hit(String),
    Miss,
    /// The backend failed. Must be handled as a miss.
    Unavailable(CacheError),
}

/// Cache-aside adapter over a shared [`CacheStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    operation_timeout: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// A cache over `store` using the TTL and timeout from `config`.
    pub fn with_config(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self::new(store, config.ttl).operation_timeout(config.operation_timeout)
    }

    /// An in-process cache built from `config`.
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::with_config(Arc::new(MemoryStore::new(config.max_entries)), config)
    }

    /// Bound every store call by `timeout`.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// Look up rendered markup. Emits hit/miss/error metrics.
    pub async fn get(&self, key: &CacheKey) -> Lookup {
        let read = tokio::time::timeout(self.operation_timeout, self.store.get(key));
        match read.await.unwrap_or_else(|_| Err(self.timed_out("get"))) {
            Ok(Some(markup)) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Lookup::Hit(markup)
            }
            Ok(None) => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                Lookup::Miss
            }
            Err(err) => {
                metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "get")
                    .increment(1);
                Lookup::Unavailable(err)
            }
        }
    }

    /// Write rendered markup with the configured TTL.
    pub async fn set(&self, key: &CacheKey, markup: &str) -> Result<(), CacheError> {
        let write = tokio::time::timeout(
            self.operation_timeout,
            self.store.set(key, markup, self.ttl),
        );
        let result = write.await.unwrap_or_else(|_| Err(self.timed_out("set")));
        if result.is_err() {
            metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "set").increment(1);
        }
        result
    }

    fn timed_out(&self, operation: &str) -> CacheError {
        CacheError::backend(
            self.store.name(),
            format!("{operation} timed out after {:?}", self.operation_timeout),
        )
    }
}
