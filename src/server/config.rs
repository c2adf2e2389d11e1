//! Configuration loading for huginnd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! With no file at all, built-in defaults apply. Environment variables
//! (`HUGINN_ADDRESS`, `REQ_DEBUG`, `CLUSTER_MAX_CONCURRENCY`,
//! `CACHE_TTL_SECONDS`) override file values.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.huginn/secrets.toml` (user, must be 0600)
//! 2. `/etc/huginn/secrets.toml` (system, must be 0600)

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::level_filters::LevelFilter;

use crate::access::DEFAULT_VERIFY_URL;
use crate::render::{DEFAULT_MAX_CONCURRENCY, DEFAULT_TASK_TIMEOUT, PoolConfig};
use crate::{CacheConfig, HuginnError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:3000).
    #[serde(default = "default_address")]
    pub address: String,
    /// Log every inbound request's URL and headers.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            debug: false,
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:3000".to_string()
}

/// Renderer pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    /// Maximum simultaneous render jobs (default: 6).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Hard ceiling on a single job, in seconds (default: 60).
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
    /// User agent sent by the fetch engine.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            task_timeout_secs: default_task_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl RendererConfig {
    pub fn pool_config(&self, verbose: bool) -> PoolConfig {
        let max_concurrency = match self.max_concurrency {
            0 => DEFAULT_MAX_CONCURRENCY,
            n => n,
        };
        PoolConfig::new()
            .max_concurrency(max_concurrency)
            .task_timeout(Duration::from_secs(self.task_timeout_secs))
            .verbose(verbose)
    }
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_task_timeout() -> u64 {
    DEFAULT_TASK_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    crate::version::user_agent()
}

/// Which store backs the response cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Redis,
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Entry lifetime in seconds (default: 300).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// In-memory capacity (default: 10000). Ignored by redis.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    #[serde(default)]
    pub backend: CacheBackendKind,
    /// Redis connection URL (default: redis://redis:6379).
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Longest a single cache read or write may take, in milliseconds
    /// (default: 1000). Slower calls are treated as cache failures.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            max_entries: default_max_entries(),
            backend: CacheBackendKind::default(),
            redis_url: default_redis_url(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl CacheSettings {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .ttl(Duration::from_secs(self.ttl_secs))
            .max_entries(self.max_entries)
            .operation_timeout(Duration::from_millis(self.operation_timeout_ms.max(1)))
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_operation_timeout_ms() -> u64 {
    1000
}

fn default_redis_url() -> String {
    "redis://redis:6379".to_string()
}

/// Access gate settings. The gate itself is enabled by the presence of a
/// token secret.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Session token lifetime in seconds (default: 3600).
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// Challenge verification endpoint.
    #[serde(default = "default_verify_url")]
    pub challenge_verify_url: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
            challenge_verify_url: default_verify_url(),
        }
    }
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_verify_url() -> String {
    DEFAULT_VERIFY_URL.to_string()
}

/// Log output encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Base level (trace|debug|info|warn|error|off, default: info).
    #[serde(default = "default_level", deserialize_with = "deserialize_level")]
    pub level: LevelFilter,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> LevelFilter {
    LevelFilter::INFO
}

fn deserialize_level<'de, D>(deserializer: D) -> std::result::Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    LevelFilter::from_str(&raw).map_err(serde::de::Error::custom)
}

impl Config {
    /// Load configuration from the standard locations, then apply
    /// environment overrides.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Config::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Numeric overrides that are zero or unparseable fall back to the
    /// built-in default rather than failing startup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup("HUGINN_ADDRESS") {
            self.server.address = address;
        }
        if let Some(debug) = lookup("REQ_DEBUG") {
            self.server.debug = parse_flag(&debug);
        }
        if let Some(raw) = lookup("CLUSTER_MAX_CONCURRENCY") {
            self.renderer.max_concurrency = positive_or(&raw, default_max_concurrency());
        }
        if let Some(raw) = lookup("CACHE_TTL_SECONDS") {
            self.cache.ttl_secs = positive_or(&raw, default_ttl());
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn positive_or<T>(raw: &str, default: T) -> T
where
    T: FromStr + PartialEq + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => value,
        _ => default,
    }
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    /// Signing key for session tokens. Enables the access gate.
    #[serde(default)]
    pub token_secret: Option<String>,
    /// Shared secret for the challenge verification service.
    #[serde(default)]
    pub challenge_secret: Option<String>,
    #[serde(default)]
    pub redis_password: Option<String>,
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.huginn/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/huginn/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists. Environment fallbacks are
    /// applied separately by [`Secrets::with_env_fallbacks`].
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".huginn").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/huginn/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a specific secrets file, enforcing owner-only permissions.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(HuginnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Fill secrets missing from the file (or empty there) from the
    /// environment read through `lookup`: `JWT_SECRET`, `TURNSTILE_SECRET`
    /// and `REDIS_PASSWORD`.
    pub fn with_env_fallbacks<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.token_secret = present_or(self.token_secret, || lookup("JWT_SECRET"));
        self.challenge_secret = present_or(self.challenge_secret, || lookup("TURNSTILE_SECRET"));
        self.redis_password = present_or(self.redis_password, || lookup("REDIS_PASSWORD"));
        self
    }

    /// Session token signing key.
    pub fn token_secret(&self) -> Option<String> {
        present(&self.token_secret)
    }

    /// Challenge verification secret.
    pub fn challenge_secret(&self) -> Option<String> {
        present(&self.challenge_secret)
    }

    pub fn redis_password(&self) -> Option<String> {
        present(&self.redis_password)
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.clone().filter(|s| !s.is_empty())
}

fn present_or<F>(value: Option<String>, fallback: F) -> Option<String>
where
    F: FnOnce() -> Option<String>,
{
    value.filter(|s| !s.is_empty()).or_else(fallback)
}
