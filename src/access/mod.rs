//! Access control for cache misses.
//!
//! - [`AccessGate`]: the seam the gateway calls, with [`OpenGate`] and
//!   [`TokenGate`] implementations.
//! - [`TokenSigner`]: HMAC-signed, expiring session tokens.
//! - [`ChallengeVerifier`]: remote challenge-answer verification.

pub mod challenge;
pub mod gate;
pub mod token;

pub use challenge::{ChallengeVerifier, DEFAULT_VERIFY_URL};
pub use gate::{AccessGate, CHALLENGE_TOKEN_PREFIX, OpenGate, TokenGate};
pub use token::{DEFAULT_TOKEN_TTL, TokenSigner};
