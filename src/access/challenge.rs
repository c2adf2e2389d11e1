//! Remote verification of human-challenge responses (Cloudflare Turnstile
//! compatible `siteverify` protocol).

use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{HuginnError, Result};

/// Default verification endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Client for a challenge `siteverify` endpoint.
#[derive(Clone)]
pub struct ChallengeVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl ChallengeVerifier {
    /// Verifier against the default endpoint.
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_verify_url(secret, DEFAULT_VERIFY_URL)
    }

    /// Verifier against a custom endpoint (self-hosted or test server).
    pub fn with_verify_url(secret: impl Into<String>, verify_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            verify_url: verify_url.into(),
            secret: secret.into(),
        }
    }

    /// Ask the endpoint whether `response` is a valid, unspent challenge answer.
    ///
    /// `Ok(false)` is a clean rejection; `Err` means the endpoint could not
    /// be asked or answered nonsense.
    pub async fn verify(&self, response: &str, remote_addr: Option<IpAddr>) -> Result<bool> {
        let mut form = vec![("secret", self.secret.clone()), ("response", response.to_string())];
        if let Some(addr) = remote_addr {
            form.push(("remoteip", addr.to_string()));
        }

        let resp = self
            .client
            .post(&self.verify_url)
            .timeout(VERIFY_TIMEOUT)
            .form(&form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(HuginnError::Http(format!(
                "challenge verification returned {}",
                resp.status()
            )));
        }

        let body: VerifyResponse = resp.json().await?;
        if !body.success {
            debug!(error_codes = ?body.error_codes, "challenge rejected");
        }
        Ok(body.success)
    }
}
