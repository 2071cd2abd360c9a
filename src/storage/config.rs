//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux/macOS: `~/.config/lra/config.toml`
//! - Windows: `%APPDATA%/lra/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `COURTLISTENER_API_KEY` (or `COURT_LISTENER_API_KEY`): API token
//! - `LRA_BASE_URL`: Upstream base URL
//! - `LRA_TIMEOUT`: Total request timeout in seconds
//! - `LRA_RETRY_ATTEMPTS`: Attempts per request (including the first)
//! - `LRA_CACHE_ENABLED`: Enable the response cache (1, true, yes / 0, false, no)
//! - `LRA_CACHE_DIR`: Cache root directory
//! - `LRA_CONFIG`: Override config file path

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::AppPaths;
use super::cache::CategoryTtls;
use crate::core::circuit_breaker::CircuitBreakerConfig;
use crate::core::http::{DEFAULT_BASE_URL, HttpTimeouts};
use crate::core::retry::RetryPolicy;
use crate::error::{LraError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable for the API token.
pub const ENV_API_KEY: &str = "COURTLISTENER_API_KEY";
/// Alternate spelling accepted for the API token.
pub const ENV_API_KEY_ALT: &str = "COURT_LISTENER_API_KEY";
/// Environment variable for the upstream base URL.
pub const ENV_BASE_URL: &str = "LRA_BASE_URL";
/// Environment variable for the total request timeout in seconds.
pub const ENV_TIMEOUT: &str = "LRA_TIMEOUT";
/// Environment variable for attempts per request.
pub const ENV_RETRY_ATTEMPTS: &str = "LRA_RETRY_ATTEMPTS";
/// Environment variable to enable or disable the cache.
pub const ENV_CACHE_ENABLED: &str = "LRA_CACHE_ENABLED";
/// Environment variable for the cache root directory.
pub const ENV_CACHE_DIR: &str = "LRA_CACHE_DIR";
/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "LRA_CONFIG";

/// Subdirectory of the platform cache dir holding response entries.
const CACHE_SUBDIR: &str = "courtlistener";

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream API settings.
    pub api: ApiConfig,
    /// Circuit breaker settings.
    pub circuit_breaker: BreakerSettings,
    /// Response cache settings.
    pub cache: CacheSettings,
}

/// Upstream API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL all endpoint paths are joined onto.
    pub base_url: String,
    /// API token sent as `Authorization: Token <key>`.
    pub api_key: Option<String>,
    /// Total time budget per request, including body transfer.
    pub timeout_seconds: f64,
    /// Time budget for establishing a connection.
    pub connect_timeout_seconds: f64,
    /// Time budget between reads of the response body.
    pub read_timeout_seconds: f64,
    /// How long idle pooled connections are kept.
    pub pool_idle_timeout_seconds: f64,
    /// Attempts per request, including the first.
    pub retry_attempts: u32,
    /// Base of the exponential backoff.
    pub retry_backoff_seconds: f64,
    /// Upper bound on any single backoff delay.
    pub retry_backoff_cap_seconds: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_seconds: 30.0,
            connect_timeout_seconds: 10.0,
            read_timeout_seconds: 60.0,
            pool_idle_timeout_seconds: 90.0,
            retry_attempts: 3,
            retry_backoff_seconds: 1.0,
            retry_backoff_cap_seconds: 30.0,
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call.
    pub cooldown_seconds: f64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_seconds: 60.0,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether responses are cached at all.
    pub enabled: bool,
    /// Cache root. Defaults to the platform cache dir.
    pub dir: Option<PathBuf>,
    /// Whether search-backed lookups are cached: `search_opinions` results
    /// and resolved citations. Citing-case results are cached regardless.
    pub search_enabled: bool,
    /// TTL for opinion metadata, in seconds.
    pub ttl_metadata: u64,
    /// TTL for opinion full text, in seconds.
    pub ttl_text: u64,
    /// TTL for search results, in seconds.
    pub ttl_search: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let ttls = CategoryTtls::default();
        Self {
            enabled: true,
            dir: None,
            search_enabled: true,
            ttl_metadata: ttls.metadata.as_secs(),
            ttl_text: ttls.text.as_secs(),
            ttl_search: ttls.search.as_secs(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| LraError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Resolve the effective configuration for this process.
    ///
    /// The file comes from `explicit_path` (a CLI flag), then `LRA_CONFIG`,
    /// then the platform default. Environment overrides are applied on top
    /// and the result is validated.
    pub fn resolve(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::load_from(path)?,
            None => match std::env::var(ENV_CONFIG) {
                Ok(path) => Self::load_from(Path::new(&path))?,
                Err(_) => Self::load()?,
            },
        };
        config.apply_env_from(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY).or_else(|| non_empty(ENV_API_KEY_ALT)) {
            self.api.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(raw) = non_empty(ENV_TIMEOUT) {
            self.api.timeout_seconds = raw.trim().parse().map_err(|_| LraError::ConfigInvalid {
                key: ENV_TIMEOUT.to_string(),
                message: format!("expected seconds, got '{raw}'"),
            })?;
        }
        if let Some(raw) = non_empty(ENV_RETRY_ATTEMPTS) {
            self.api.retry_attempts = raw.trim().parse().map_err(|_| LraError::ConfigInvalid {
                key: ENV_RETRY_ATTEMPTS.to_string(),
                message: format!("expected a positive integer, got '{raw}'"),
            })?;
        }
        if let Some(raw) = non_empty(ENV_CACHE_ENABLED) {
            self.cache.enabled = parse_bool(&raw).ok_or_else(|| LraError::ConfigInvalid {
                key: ENV_CACHE_ENABLED.to_string(),
                message: format!("expected true/false, got '{raw}'"),
            })?;
        }
        if let Some(dir) = non_empty(ENV_CACHE_DIR) {
            self.cache.dir = Some(PathBuf::from(dir.trim()));
        }
        Ok(())
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - The base URL parses as an absolute http(s) URL
    /// - Timeouts and the breaker cooldown are positive
    /// - Backoff values are non-negative
    /// - Attempt and threshold counts are at least 1
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| invalid("api.base_url", e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("api.base_url", "scheme must be http or https"));
        }

        self.timeouts()?;
        positive_secs("circuit_breaker.cooldown_seconds", self.circuit_breaker.cooldown_seconds)?;
        non_negative_secs("api.retry_backoff_seconds", self.api.retry_backoff_seconds)?;
        non_negative_secs("api.retry_backoff_cap_seconds", self.api.retry_backoff_cap_seconds)?;

        if self.api.retry_attempts == 0 {
            return Err(invalid("api.retry_attempts", "must be at least 1"));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(invalid("circuit_breaker.failure_threshold", "must be at least 1"));
        }
        Ok(())
    }

    /// HTTP timeouts derived from `[api]`.
    pub fn timeouts(&self) -> Result<HttpTimeouts> {
        Ok(HttpTimeouts {
            total: positive_secs("api.timeout_seconds", self.api.timeout_seconds)?,
            connect: positive_secs("api.connect_timeout_seconds", self.api.connect_timeout_seconds)?,
            read: positive_secs("api.read_timeout_seconds", self.api.read_timeout_seconds)?,
            pool_idle: positive_secs(
                "api.pool_idle_timeout_seconds",
                self.api.pool_idle_timeout_seconds,
            )?,
        })
    }

    /// Retry policy derived from `[api]`.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy::new(
            self.api.retry_attempts,
            non_negative_secs("api.retry_backoff_seconds", self.api.retry_backoff_seconds)?,
            non_negative_secs("api.retry_backoff_cap_seconds", self.api.retry_backoff_cap_seconds)?,
        ))
    }

    /// Circuit breaker settings derived from `[circuit_breaker]`.
    pub fn breaker_config(&self) -> Result<CircuitBreakerConfig> {
        Ok(CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker.failure_threshold.max(1),
            cooldown: positive_secs(
                "circuit_breaker.cooldown_seconds",
                self.circuit_breaker.cooldown_seconds,
            )?,
        })
    }

    /// Per-category cache TTLs.
    #[must_use]
    pub const fn cache_ttls(&self) -> CategoryTtls {
        CategoryTtls {
            metadata: Duration::from_secs(self.cache.ttl_metadata),
            text: Duration::from_secs(self.cache.ttl_text),
            search: Duration::from_secs(self.cache.ttl_search),
        }
    }

    /// Effective cache root directory.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().cache.join(CACHE_SUBDIR))
    }
}

fn invalid(key: &str, message: impl std::fmt::Display) -> LraError {
    LraError::ConfigInvalid {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn positive_secs(key: &str, secs: f64) -> Result<Duration> {
    if secs <= 0.0 {
        return Err(invalid(key, format!("must be greater than 0, got {secs}")));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(key, e))
}

fn non_negative_secs(key: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(key, e))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
