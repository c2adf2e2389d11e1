//! Caching subsystem.
//!
//! - [`CacheKey`]: deterministic, namespaced identity of a render request.
//! - [`CacheStore`]: the get / set-with-TTL backend seam, with
//!   [`MemoryStore`] and (feature `redis`) `RedisStore` implementations.
//! - [`ResponseCache`]: best-effort adapter the gateway uses. See the
//!   [`response`] module docs for failure semantics.

pub mod key;
pub mod response;
pub mod store;

pub use key::{CACHE_NAMESPACE, CacheKey};
pub use response::{CacheConfig, Lookup, ResponseCache};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use store::{CacheStore, MemoryStore};
