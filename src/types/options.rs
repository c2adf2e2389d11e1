//! Per-request render options and their resolution from transport headers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wait condition used when the request carries none.
pub const DEFAULT_WAIT_UNTIL: &str = "networkidle2";

/// Raw timeout string used when the request carries none.
pub const DEFAULT_TIMEOUT_RAW: &str = "30000";

/// Navigation timeout in milliseconds used when the header is absent or not all digits.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Lifecycle point a navigation must reach before markup is captured.
///
/// Parsing is exact and case-sensitive. Values the pool does not know are
/// kept as [`WaitUntil::Unsupported`] so the raw header still feeds the
/// cache key; the pool rejects them before any engine work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle0,
    #[default]
    NetworkIdle2,
    Unsupported(String),
}

impl WaitUntil {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "load" => WaitUntil::Load,
            "domcontentloaded" => WaitUntil::DomContentLoaded,
            "networkidle0" => WaitUntil::NetworkIdle0,
            "networkidle2" => WaitUntil::NetworkIdle2,
            other => WaitUntil::Unsupported(other.to_string()),
        }
    }

    /// The header spelling of this condition. Round-trips through [`parse`](Self::parse).
    pub fn as_str(&self) -> &str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle0 => "networkidle0",
            WaitUntil::NetworkIdle2 => "networkidle2",
            WaitUntil::Unsupported(raw) => raw,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, WaitUntil::Unsupported(_))
    }
}

impl fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WaitUntil {
    fn from(raw: String) -> Self {
        WaitUntil::parse(&raw)
    }
}

impl From<WaitUntil> for String {
    fn from(wait: WaitUntil) -> Self {
        wait.as_str().to_string()
    }
}

/// Canonical render options for one request.
///
/// `timeout_raw` is kept verbatim because it, not the parsed value, is part
/// of the cache identity: `"030000"` and `"30000"` render identically but
/// are cached separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub wait_until: WaitUntil,
    pub timeout_ms: u64,
    pub timeout_raw: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        resolve(None, None)
    }
}

impl RenderOptions {
    /// Resolve options from the raw `x-browser-wait-until` and
    /// `x-browser-timeout` header values. See [`resolve`].
    pub fn from_headers(wait_until: Option<&str>, timeout: Option<&str>) -> Self {
        resolve(wait_until, timeout)
    }
}

/// Normalise optional header values into [`RenderOptions`].
///
/// - absent wait condition → `networkidle2`
/// - absent timeout → raw `"30000"`
/// - the timeout is parsed only when the raw string is all ASCII digits;
///   anything else (including `""`, `"30s"`, `"-1"`) yields 30000 ms
pub fn resolve(wait_until: Option<&str>, timeout: Option<&str>) -> RenderOptions {
    let wait_until = WaitUntil::parse(wait_until.unwrap_or(DEFAULT_WAIT_UNTIL));
    let timeout_raw = timeout.unwrap_or(DEFAULT_TIMEOUT_RAW).to_string();
    let timeout_ms = if is_all_digits(&timeout_raw) {
        // Digit strings too long for u64 fall back like any other garbage.
        timeout_raw.parse().unwrap_or(DEFAULT_TIMEOUT_MS)
    } else {
        DEFAULT_TIMEOUT_MS
    };

    RenderOptions {
        wait_until,
        timeout_ms,
        timeout_raw,
    }
}

fn is_all_digits(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}
