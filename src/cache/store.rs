//! Cache store backends.
//!
//! The gateway talks to the backing store only through [`CacheStore`]'s
//! get / set-with-TTL pair. Errors are reported faithfully here; absorbing
//! them is the job of [`ResponseCache`](super::ResponseCache).
//!
//! - [`MemoryStore`]: in-process moka cache with per-entry TTL. Default.
//! - [`RedisStore`] (feature `redis`): shared store for several gateway
//!   instances. Connects lazily on first use and reconnects after the
//!   server drops the connection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use super::CacheKey;
use crate::error::CacheError;

/// Get / set-with-TTL store for rendered markup.
///
/// Implementations must be safe for concurrent use; the gateway adds no
/// locking of its own. Concurrent writers to one key: last writer wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch an unexpired entry. `Ok(None)` is a plain miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    /// Store (or overwrite) an entry that expires after `ttl`.
    async fn set(&self, key: &CacheKey, markup: &str, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Clone)]
struct Entry {
    markup: Arc<str>,
    ttl: Duration,
}

/// Expires every entry after the TTL it was written with; overwrites restart the clock.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process LRU store with per-entry TTL.
pub struct MemoryStore {
    entries: Cache<String, Entry>,
}

impl MemoryStore {
    /// Create a store holding at most `max_entries` rendered pages.
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }

    /// Number of entries currently held (approximate until pending work runs).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        Ok(self
            .entries
            .get(key.as_str())
            .await
            .map(|entry| entry.markup.to_string()))
    }

    async fn set(&self, key: &CacheKey, markup: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(
                key.as_str().to_string(),
                Entry {
                    markup: Arc::from(markup),
                    ttl,
                },
            )
            .await;
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub use self::redis_store::RedisStore;

#[cfg(feature = "redis")]
mod redis_store {
    use std::time::Duration;

    use async_trait::async_trait;
    use redis::aio::ConnectionManager;
    use redis::{AsyncCommands, Client, IntoConnectionInfo};
    use tokio::sync::OnceCell;
    use tracing::info;

    use super::CacheStore;
    use crate::cache::CacheKey;
    use crate::error::CacheError;

    const BACKEND: &str = "redis";

    /// Redis-backed store shared between gateway instances.
    ///
    /// The connection manager is built on first use. A failed initial
    /// connect is reported to that caller and attempted again on the next
    /// call; once built, the manager re-establishes dropped connections
    /// itself.
    pub struct RedisStore {
        client: Client,
        connection: OnceCell<ConnectionManager>,
    }

    impl RedisStore {
        /// Prepare a store for `url`, overriding its password when one is given.
        pub fn new(url: &str, password: Option<&str>) -> Result<Self, CacheError> {
            let mut info = url
                .into_connection_info()
                .map_err(|e| CacheError::backend(BACKEND, e))?;
            if let Some(password) = password {
                info.redis.password = Some(password.to_string());
            }
            let client = Client::open(info).map_err(|e| CacheError::backend(BACKEND, e))?;
            Ok(Self {
                client,
                connection: OnceCell::new(),
            })
        }

        async fn connection(&self) -> Result<ConnectionManager, CacheError> {
            self.connection
                .get_or_try_init(|| async {
                    let conn = ConnectionManager::new(self.client.clone())
                        .await
                        .map_err(|e| CacheError::backend(BACKEND, e))?;
                    info!("connected to redis cache store");
                    Ok::<_, CacheError>(conn)
                })
                .await
                .cloned()
        }
    }

    #[async_trait]
    impl CacheStore for RedisStore {
        fn name(&self) -> &str {
            BACKEND
        }

        async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
            let mut conn = self.connection().await?;
            conn.get::<_, Option<String>>(key.as_str())
                .await
                .map_err(|e| CacheError::backend(BACKEND, e))
        }

        async fn set(&self, key: &CacheKey, markup: &str, ttl: Duration) -> Result<(), CacheError> {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(key.as_str(), markup, ttl.as_secs().max(1))
                .await
                .map_err(|e| CacheError::backend(BACKEND, e))
        }
    }
}
