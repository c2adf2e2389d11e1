//! Huginn error types

use std::time::Duration;

/// Failure of a single render job, as seen by the request orchestrator.
///
/// Every variant collapses to the same "render failed" signal at the HTTP
/// boundary; the distinction exists for logs and metrics.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// The engine could not be launched.
    #[error("renderer pool unavailable: {0}")]
    PoolUnavailable(String),

    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The requested wait condition is not one the pool understands.
    #[error("unsupported wait condition: {0:?}")]
    UnsupportedWaitCondition(String),

    /// The job's task panicked or was cancelled.
    #[error("render task crashed: {0}")]
    Crashed(String),

    #[error("renderer pool is closed")]
    Closed,
}

impl RenderError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::PoolUnavailable(_) => "pool_unavailable",
            RenderError::Timeout(_) => "timeout",
            RenderError::Navigation(_) => "navigation",
            RenderError::UnsupportedWaitCondition(_) => "unsupported_wait_condition",
            RenderError::Crashed(_) => "crashed",
            RenderError::Closed => "closed",
        }
    }
}

/// Cache backend failure. Never surfaced to clients.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error ({backend}): {message}")]
    Backend { backend: String, message: String },
}

impl CacheError {
    pub fn backend(backend: impl Into<String>, message: impl ToString) -> Self {
        CacheError::Backend {
            backend: backend.into(),
            message: message.to_string(),
        }
    }
}

/// Session token validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("bad token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("invalid signing key")]
    InvalidKey,
}

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    #[error("no renderer configured")]
    NoRenderer,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Token(#[from] TokenError),

    // Collaborator/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for HuginnError {
    fn from(err: reqwest::Error) -> Self {
        HuginnError::Http(err.to_string())
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
