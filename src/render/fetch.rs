//! HTTP-fetching render engine.
//!
//! Serves the markup the destination returns without executing scripts.
//! A navigation "completes" once the full body has arrived, which
//! satisfies every supported wait condition. Non-2xx responses are still
//! successful navigations: the page that came back is the page rendered.

use std::sync::Arc;

use async_trait::async_trait;

use super::{EngineLauncher, RenderEngine};
use crate::error::RenderError;
use crate::types::{PROBE_URL, RenderJob};

/// Markup of an empty document, returned for `about:blank`.
pub const BLANK_DOCUMENT: &str = "<html><head></head><body></body></html>";

/// Launches [`FetchEngine`]s.
#[derive(Debug, Clone)]
pub struct FetchLauncher {
    user_agent: String,
}

impl FetchLauncher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Default for FetchLauncher {
    fn default() -> Self {
        Self::new(crate::version::user_agent())
    }
}

#[async_trait]
impl EngineLauncher for FetchLauncher {
    async fn launch(&self) -> Result<Arc<dyn RenderEngine>, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| RenderError::PoolUnavailable(e.to_string()))?;
        Ok(Arc::new(FetchEngine { client }))
    }
}

/// Engine that fetches destinations over HTTP.
pub struct FetchEngine {
    client: reqwest::Client,
}

impl FetchEngine {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RenderEngine for FetchEngine {
    fn name(&self) -> &str {
        "fetch"
    }

    async fn render(&self, job: &RenderJob) -> Result<String, RenderError> {
        if job.url == PROBE_URL {
            return Ok(BLANK_DOCUMENT.to_string());
        }

        let mut request = self.client.get(&job.url);
        if let Some(timeout) = job.timeout() {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| navigation_error(e, job))?;
        response.text().await.map_err(|e| navigation_error(e, job))
    }
}

fn navigation_error(err: reqwest::Error, job: &RenderJob) -> RenderError {
    match job.timeout() {
        Some(timeout) if err.is_timeout() => RenderError::Timeout(timeout),
        _ => RenderError::Navigation(err.to_string()),
    }
}
