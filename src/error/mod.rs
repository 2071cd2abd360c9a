//! Error types for lra.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized by how a caller should react to them:
//! - **Transient**: connection failures, timeouts, HTTP 429 and 5xx. Retried by
//!   the client and surfaced only once the retry budget is exhausted.
//! - **ClientRequest**: HTTP 4xx other than 429 and rejected request
//!   parameters. Never retried.
//! - **CircuitOpen**: the circuit breaker refused to contact the upstream.
//!   Callers can fall back to cached-only behavior.
//! - **Configuration**: config file parsing or validation problems.
//! - **Response**: the upstream answered with something we could not parse.
//! - **Internal**: I/O, JSON and unclassified failures.
//!
//! Cache I/O problems never show up here: the cache recovers from them
//! locally. Partial failures are not errors either; they are reported through
//! [`PartialResult`](crate::core::models::PartialResult).
//!
//! Each error has a stable error code (e.g., `LRA-N001`) for programmatic handling.

pub mod suggestions;

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transient upstream or network failure (retryable).
    Transient,
    /// The request itself was rejected (4xx other than 429, invalid parameters).
    ClientRequest,
    /// The circuit breaker is open and the upstream was not contacted.
    CircuitOpen,
    /// Configuration issues.
    Configuration,
    /// Upstream response could not be interpreted.
    Response,
    /// Internal errors (I/O, serialization, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Transient => "Transient network error",
            Self::ClientRequest => "Client request error",
            Self::CircuitOpen => "Circuit breaker open",
            Self::Configuration => "Configuration error",
            Self::Response => "Response error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Transient => "N",
            Self::ClientRequest => "R",
            Self::CircuitOpen => "B",
            Self::Configuration => "C",
            Self::Response => "P",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the `lra` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Request rejected by upstream or invalid arguments
    RequestError = 2,
    /// Config or response parse errors
    ParseError = 3,
    /// Timeout
    Timeout = 4,
    /// Upstream unavailable (retries exhausted or circuit open)
    Unavailable = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Which time budget a timed-out request ran out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Establishing the connection.
    Connect,
    /// Waiting between reads of the response.
    Read,
    /// The whole exchange.
    Total,
}

impl TimeoutPhase {
    /// Config key that sets this budget.
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Connect => "api.connect_timeout_seconds",
            Self::Read => "api.read_timeout_seconds",
            Self::Total => "api.timeout_seconds",
        }
    }
}

impl std::fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Read => "read",
            Self::Total => "request",
        })
    }
}

/// Main error type for lra operations.
#[derive(Error, Debug)]
pub enum LraError {
    // ==========================================================================
    // Transient errors (Category: Transient)
    // ==========================================================================
    /// Request ran out of its connect, read or total time budget.
    #[error("{phase} timeout after {seconds}s: {url}")]
    Timeout {
        url: String,
        phase: TimeoutPhase,
        seconds: f64,
    },

    /// Could not establish a connection to the upstream.
    #[error("connection to {url} failed: {message}")]
    ConnectionFailed { url: String, message: String },

    /// Rate limited by the upstream (HTTP 429).
    #[error("rate limited by upstream: {url}")]
    RateLimited {
        url: String,
        retry_after: Option<Duration>,
    },

    /// Upstream answered with a 5xx status.
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamUnavailable { status: u16, url: String },

    /// Generic network error (interrupted body, protocol error).
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Client request errors (Category: ClientRequest)
    // ==========================================================================
    /// Upstream rejected the request (4xx other than 429).
    #[error("HTTP {status} from {url}: {message}")]
    ClientRequest {
        status: u16,
        url: String,
        message: String,
    },

    /// Request parameters failed validation before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ==========================================================================
    // Circuit breaker (Category: CircuitOpen)
    // ==========================================================================
    /// The circuit breaker is open; the upstream was not contacted.
    #[error("circuit breaker open until {until}")]
    CircuitOpen { until: DateTime<Utc> },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing a configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid { key: String, message: String },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown cache category name.
    #[error("invalid cache type '{0}'. Valid types: metadata, text, search")]
    InvalidCacheCategory(String),

    // ==========================================================================
    // Response errors (Category: Response)
    // ==========================================================================
    /// Failed to parse an upstream response body.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LraError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Timeout { .. } => ExitCode::Timeout,

            Self::ConnectionFailed { .. }
            | Self::RateLimited { .. }
            | Self::UpstreamUnavailable { .. }
            | Self::Network(_)
            | Self::CircuitOpen { .. } => ExitCode::Unavailable,

            Self::ClientRequest { .. }
            | Self::InvalidRequest(_)
            | Self::InvalidCacheCategory(_) => ExitCode::RequestError,

            Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_)
            | Self::ParseResponse(_) => ExitCode::ParseError,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout { .. }
            | Self::ConnectionFailed { .. }
            | Self::RateLimited { .. }
            | Self::UpstreamUnavailable { .. }
            | Self::Network(_) => ErrorCategory::Transient,

            Self::ClientRequest { .. } | Self::InvalidRequest(_) => ErrorCategory::ClientRequest,

            Self::CircuitOpen { .. } => ErrorCategory::CircuitOpen,

            Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_)
            | Self::InvalidCacheCategory(_) => ErrorCategory::Configuration,

            Self::ParseResponse(_) => ErrorCategory::Response,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `LRA-{category}{number}` where category is:
    /// - N: Transient network
    /// - R: Client request
    /// - B: Circuit breaker
    /// - C: Configuration
    /// - P: Response parsing
    /// - X: Internal
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "LRA-N001",
            Self::ConnectionFailed { .. } => "LRA-N002",
            Self::RateLimited { .. } => "LRA-N010",
            Self::UpstreamUnavailable { .. } => "LRA-N011",
            Self::Network(_) => "LRA-N099",

            Self::ClientRequest { .. } => "LRA-R001",
            Self::InvalidRequest(_) => "LRA-R010",

            Self::CircuitOpen { .. } => "LRA-B001",

            Self::ConfigParse { .. } => "LRA-C001",
            Self::ConfigInvalid { .. } => "LRA-C002",
            Self::Config(_) => "LRA-C003",
            Self::InvalidCacheCategory(_) => "LRA-C010",

            Self::ParseResponse(_) => "LRA-P001",

            Self::Io(_) => "LRA-X001",
            Self::Json(_) => "LRA-X002",
            Self::Other(_) => "LRA-X099",
        }
    }

    /// Returns whether the error is potentially recoverable by retrying.
    ///
    /// Only transient errors qualify. A circuit-open signal is deliberately
    /// excluded: it must reach the caller without an internal retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transient)
    }

    /// Returns the retry-after duration if the upstream specified one.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns the HTTP status code associated with this error, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::UpstreamUnavailable { status, .. } | Self::ClientRequest { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Get fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::Timeout {
                url,
                phase,
                seconds,
            } => suggestions::timeout_suggestions(url, *phase, *seconds),
            Self::ConnectionFailed { url, .. } => suggestions::connection_failed_suggestions(url),
            Self::RateLimited { retry_after, .. } => {
                suggestions::rate_limited_suggestions(*retry_after)
            }
            Self::UpstreamUnavailable { status, .. } => {
                suggestions::upstream_unavailable_suggestions(*status)
            }
            Self::ClientRequest { status, .. } => suggestions::client_request_suggestions(*status),
            Self::CircuitOpen { until } => suggestions::circuit_open_suggestions(*until),
            Self::ConfigParse { path, .. } => suggestions::config_parse_suggestions(path),
            Self::ConfigInvalid { key, .. } => suggestions::config_invalid_suggestions(key),
            Self::InvalidCacheCategory(_) => vec![FixSuggestion::new(
                vec!["lra cache clear --type metadata".to_string()],
                "Cache types are metadata, text and search.",
            )],
            Self::Network(_)
            | Self::InvalidRequest(_)
            | Self::Config(_)
            | Self::ParseResponse(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => Vec::new(),
        }
    }
}

/// Result type alias for lra operations.
pub type Result<T> = std::result::Result<T, LraError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample_errors() -> Vec<LraError> {
        vec![
            LraError::Timeout {
                url: "https://example.test/search/".to_string(),
                phase: TimeoutPhase::Total,
                seconds: 30.0,
            },
            LraError::ConnectionFailed {
                url: "https://example.test/".to_string(),
                message: "refused".to_string(),
            },
            LraError::RateLimited {
                url: "https://example.test/".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            },
            LraError::UpstreamUnavailable {
                status: 503,
                url: "https://example.test/".to_string(),
            },
            LraError::Network("reset".to_string()),
            LraError::ClientRequest {
                status: 404,
                url: "https://example.test/opinions/1/".to_string(),
                message: "Not found".to_string(),
            },
            LraError::InvalidRequest("limit must be at least 1".to_string()),
            LraError::CircuitOpen { until: Utc::now() },
            LraError::ConfigParse {
                path: "/tmp/config.toml".to_string(),
                message: "bad".to_string(),
            },
            LraError::ConfigInvalid {
                key: "api.timeout_seconds".to_string(),
                message: "must be positive".to_string(),
            },
            LraError::Config("bad".to_string()),
            LraError::InvalidCacheCategory("blobs".to_string()),
            LraError::ParseResponse("eof".to_string()),
            LraError::Io(std::io::Error::other("disk")),
            LraError::Other(anyhow::anyhow!("boom")),
        ]
    }

    #[test]
    fn transient_errors_are_retryable() {
        for err in sample_errors() {
            let expected = err.category() == ErrorCategory::Transient;
            assert_eq!(err.is_retryable(), expected, "{err:?}");
        }
    }

    #[test]
    fn circuit_open_is_not_retryable() {
        let err = LraError::CircuitOpen { until: Utc::now() };
        assert!(!err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::CircuitOpen);
        assert_eq!(err.exit_code(), ExitCode::Unavailable);
    }

    #[test]
    fn error_codes_follow_format() {
        for err in sample_errors() {
            let code = err.error_code();
            assert!(code.starts_with("LRA-"), "{code}");
            assert_eq!(code.len(), 8, "{code}");
            let prefix = &code[4..5];
            assert_eq!(prefix, err.category().code_prefix(), "{code}");
        }
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = sample_errors();
        let codes: HashSet<_> = errors.iter().map(LraError::error_code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn status_codes_are_exposed() {
        let rate_limited = LraError::RateLimited {
            url: String::new(),
            retry_after: None,
        };
        assert_eq!(rate_limited.status_code(), Some(429));

        let not_found = LraError::ClientRequest {
            status: 404,
            url: String::new(),
            message: String::new(),
        };
        assert_eq!(not_found.status_code(), Some(404));
        assert_eq!(LraError::Network("x".into()).status_code(), None);
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        let err = LraError::RateLimited {
            url: String::new(),
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert_eq!(LraError::Network("x".into()).retry_after(), None);
    }

    #[test]
    fn exit_codes_are_correct() {
        let timeout = LraError::Timeout {
            url: String::new(),
            phase: TimeoutPhase::Connect,
            seconds: 1.0,
        };
        assert_eq!(timeout.exit_code(), ExitCode::Timeout);
        assert_eq!(
            LraError::InvalidRequest(String::new()).exit_code(),
            ExitCode::RequestError
        );
        assert_eq!(
            LraError::ParseResponse(String::new()).exit_code(),
            ExitCode::ParseError
        );
        assert_eq!(i32::from(ExitCode::Unavailable), 5);
    }

    #[test]
    fn timeout_message_names_phase_and_fractional_budget() {
        let err = LraError::Timeout {
            url: "https://example.test/opinions/1/".to_string(),
            phase: TimeoutPhase::Read,
            seconds: 0.25,
        };
        assert_eq!(
            err.to_string(),
            "read timeout after 0.25s: https://example.test/opinions/1/"
        );
        let total = LraError::Timeout {
            url: "u".to_string(),
            phase: TimeoutPhase::Total,
            seconds: 30.0,
        };
        assert_eq!(total.to_string(), "request timeout after 30s: u");
    }

    #[test]
    fn actionable_errors_have_suggestions() {
        for err in sample_errors() {
            if matches!(
                err.category(),
                ErrorCategory::CircuitOpen | ErrorCategory::Transient
            ) && !matches!(err, LraError::Network(_))
            {
                assert!(!err.fix_suggestions().is_empty(), "{err:?}");
            }
        }
    }
}
