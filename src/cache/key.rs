//! Deterministic cache identities for render requests.

use std::fmt;

use sha2::{Digest, Sha256};
use url::form_urlencoded;

/// Namespace prefixed to every key so the proxy can share a store.
pub const CACHE_NAMESPACE: &str = "proxy_cache:";

const FIELD_DELIMITER: &[u8] = b"_";

/// Namespaced, fixed-length, one-way identifier of a rendered response.
///
/// `proxy_cache:` followed by the hex SHA-256 of
/// `percent-encoded(destination) _ wait_until _ timeout_raw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a (destination, wait condition, raw timeout) triple.
    ///
    /// Order-sensitive, and no normalisation is applied beyond percent-encoding
    /// the destination: `https://a.com` and `https://a.com/` are distinct.
    pub fn derive(destination: &str, wait_until: &str, timeout_raw: &str) -> Self {
        let encoded: String = form_urlencoded::byte_serialize(destination.as_bytes()).collect();

        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        hasher.update(FIELD_DELIMITER);
        hasher.update(wait_until.as_bytes());
        hasher.update(FIELD_DELIMITER);
        hasher.update(timeout_raw.as_bytes());

        CacheKey(format!("{CACHE_NAMESPACE}{}", hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
