//! Test logging infrastructure for structured test output and debugging.
//!
//! Provides a `TestLogger` that prints phase-tagged, timed lines to stderr
//! (captured by the test harness unless `--nocapture` is passed).
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::logger::TestLogger;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let log = TestLogger::new("test_example");
//!     log.phase("setup");
//!     // ... mount mocks ...
//!     log.phase("execute");
//!     log.http_request("GET", &url);
//!     log.phase("verify");
//!     log.finish_ok();
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `TEST_LOG_LEVEL` - Set log level: trace, debug, info, warn, error (default: info)
//! - `TEST_LOG_JSON` - Set to "1" or "true" for JSON output format

#![allow(dead_code)]

use std::env;
use std::fmt::Display;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

// =============================================================================
// Log Levels
// =============================================================================

/// Log severity levels matching standard conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse from string, case-insensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// Structured log entry for JSON output mode.
#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    test: &'a str,
    phase: &'a str,
    message: &'a str,
    elapsed_ms: u128,
}

struct Settings {
    min_level: LogLevel,
    json: bool,
}

fn settings() -> &'static Settings {
    static SETTINGS: OnceLock<Settings> = OnceLock::new();
    SETTINGS.get_or_init(|| Settings {
        min_level: env::var("TEST_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or(LogLevel::Info),
        json: env::var("TEST_LOG_JSON").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
    })
}

// =============================================================================
// TestLogger
// =============================================================================

/// Per-test logger with phase and duration tracking.
pub struct TestLogger {
    test_name: String,
    start_time: Instant,
    current_phase: Mutex<String>,
}

impl TestLogger {
    /// Create a new test logger.
    #[must_use]
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            test_name: test_name.to_string(),
            start_time: Instant::now(),
            current_phase: Mutex::new("init".to_string()),
        };
        logger.log(LogLevel::Info, "Test starting");
        logger
    }

    /// Set the current test phase.
    pub fn phase(&self, phase: &str) {
        if let Ok(mut current) = self.current_phase.lock() {
            *current = phase.to_string();
        }
        self.log(LogLevel::Debug, &format!("Phase: {phase}"));
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log an HTTP request (for HTTP tests).
    pub fn http_request(&self, method: &str, url: &str) {
        self.debug(&format!("HTTP {method} {url}"));
    }

    /// Mark test as passed with duration.
    pub fn finish_ok(&self) {
        let elapsed = self.start_time.elapsed().as_millis();
        self.log(LogLevel::Info, &format!("Test passed (duration: {elapsed}ms)"));
    }

    fn log(&self, level: LogLevel, message: &str) {
        let settings = settings();
        if level < settings.min_level {
            return;
        }
        let phase = self
            .current_phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        let elapsed_ms = self.start_time.elapsed().as_millis();

        if settings.json {
            let entry = LogEntry {
                timestamp: Utc::now(),
                level,
                test: &self.test_name,
                phase: &phase,
                message,
                elapsed_ms,
            };
            if let Ok(line) = serde_json::to_string(&entry) {
                eprintln!("{line}");
            }
        } else {
            eprintln!(
                "[{level:5}] [{}] [{phase}] +{elapsed_ms}ms {message}",
                self.test_name
            );
        }
    }
}
