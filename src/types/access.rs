//! Access gate inputs and decisions.

use std::net::IpAddr;

/// What the access gate gets to see of an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Value of the `x-token` header, if any.
    pub token: Option<String>,
    /// Peer address, forwarded to remote challenge verification.
    pub remote_addr: Option<IpAddr>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

/// Outcome of one access check. Never persisted.
///
/// `rotated_token` is independent of `allowed`'s provenance: a request
/// admitted on a challenge can still be handed a fresh session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub rotated_token: Option<String>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            rotated_token: None,
        }
    }

    pub fn allow_with_token(token: impl Into<String>) -> Self {
        Self {
            allowed: true,
            rotated_token: Some(token.into()),
        }
    }

    pub fn deny() -> Self {
        Self {
            allowed: false,
            rotated_token: None,
        }
    }
}
