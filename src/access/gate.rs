//! Access gate seam and its implementations.
//!
//! The gateway consults the gate only on cache misses. Implementations
//! decide from a [`RequestContext`] and never fail: anything they cannot
//! establish is a denial.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ChallengeVerifier, TokenSigner};
use crate::types::{AccessDecision, RequestContext};

/// Prefix marking an `x-token` value as a challenge response rather than a session token.
pub const CHALLENGE_TOKEN_PREFIX: &str = "turnstile|";

/// Decides whether a cache miss may spend a render.
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Gate name for logging/debugging.
    fn name(&self) -> &str;

    /// Evaluate the caller's credential, optionally issuing a fresh token.
    async fn check_and_maybe_issue_token(&self, ctx: &RequestContext) -> AccessDecision;
}

/// Gate that admits everyone and issues nothing.
///
/// Used when no token secret is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

#[async_trait]
impl AccessGate for OpenGate {
    fn name(&self) -> &str {
        "open"
    }

    async fn check_and_maybe_issue_token(&self, _ctx: &RequestContext) -> AccessDecision {
        AccessDecision::allow()
    }
}

/// Gate backed by signed session tokens and optional challenge verification.
///
/// - `turnstile|<answer>`: verified remotely; success admits the request and
///   issues a session token.
/// - anything else: checked as a session token; valid tokens are admitted
///   without a new one.
/// - no credential, or a challenge answer with no verifier configured: denied.
pub struct TokenGate {
    signer: TokenSigner,
    challenge: Option<ChallengeVerifier>,
}

impl TokenGate {
    pub fn new(signer: TokenSigner) -> Self {
        Self {
            signer,
            challenge: None,
        }
    }

    /// Accept challenge answers, verified with `verifier`.
    pub fn with_challenge(mut self, verifier: ChallengeVerifier) -> Self {
        self.challenge = Some(verifier);
        self
    }

    async fn check_challenge(&self, answer: &str, ctx: &RequestContext) -> AccessDecision {
        let Some(verifier) = &self.challenge else {
            debug!("challenge answer presented but no verifier configured");
            return AccessDecision::deny();
        };

        match verifier.verify(answer, ctx.remote_addr).await {
            Ok(true) => AccessDecision::allow_with_token(self.signer.issue()),
            Ok(false) => AccessDecision::deny(),
            Err(err) => {
                warn!(error = %err, "challenge verification failed");
                AccessDecision::deny()
            }
        }
    }
}

#[async_trait]
impl AccessGate for TokenGate {
    fn name(&self) -> &str {
        "token"
    }

    async fn check_and_maybe_issue_token(&self, ctx: &RequestContext) -> AccessDecision {
        let Some(token) = ctx.token.as_deref() else {
            return AccessDecision::deny();
        };

        if let Some(answer) = token.strip_prefix(CHALLENGE_TOKEN_PREFIX) {
            return self.check_challenge(answer, ctx).await;
        }

        match self.signer.verify(token) {
            Ok(()) => AccessDecision::allow(),
            Err(err) => {
                debug!(error = %err, "session token rejected");
                AccessDecision::deny()
            }
        }
    }
}
