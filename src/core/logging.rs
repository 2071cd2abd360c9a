//! Diagnostic logging to stderr or a file.
//!
//! Logs never go to stdout, which carries command output. Settings come from
//! CLI flags, falling back to `LRA_LOG`, `LRA_LOG_FORMAT` and `LRA_LOG_FILE`.

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Level name or full filter directive (e.g. `lra=debug,reqwest=info`).
pub const LOG_LEVEL_ENV: &str = "LRA_LOG";
/// `human`, `compact` or `json`.
pub const LOG_FORMAT_ENV: &str = "LRA_LOG_FORMAT";
/// Append logs to this file instead of stderr.
pub const LOG_FILE_ENV: &str = "LRA_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable logs.
    #[default]
    Human,
    /// JSON logs (one event per line).
    Json,
    /// Compact logs (single line, terse).
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Log level from CLI argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Parse from CLI argument.
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "verbose" | "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Convert to tracing filter string.
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Convert to tracing level.
    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive.
    pub filter: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// Merge CLI choices with environment values read through `lookup`.
    ///
    /// An explicit CLI level wins over `LRA_LOG`; `--json-output` wins over
    /// `LRA_LOG_FORMAT`. `verbose` raises the default level to debug.
    pub fn resolve_with<F>(
        cli_level: Option<LogLevel>,
        json_output: bool,
        verbose: bool,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let default_level = if verbose { LogLevel::Debug } else { LogLevel::default() };
        let filter = match (cli_level, non_empty(LOG_LEVEL_ENV)) {
            (Some(level), _) => crate_filter(level),
            (None, Some(raw)) => LogLevel::from_arg(&raw).map_or(raw, crate_filter),
            (None, None) => crate_filter(default_level),
        };

        let format = if json_output {
            LogFormat::Json
        } else {
            non_empty(LOG_FORMAT_ENV)
                .and_then(|raw| LogFormat::from_arg(&raw))
                .unwrap_or_default()
        };

        Self {
            filter,
            format,
            file: non_empty(LOG_FILE_ENV).map(PathBuf::from),
        }
    }

    /// [`resolve_with`](Self::resolve_with) over the process environment.
    #[must_use]
    pub fn resolve(cli_level: Option<LogLevel>, json_output: bool, verbose: bool) -> Self {
        Self::resolve_with(cli_level, json_output, verbose, |name| std::env::var(name).ok())
    }
}

fn crate_filter(level: LogLevel) -> String {
    format!("lra={}", level.as_filter())
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(settings: &LogSettings) {
    let file = settings.file.as_ref().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .inspect_err(|e| eprintln!("warning: cannot open log file {}: {e}", path.display()))
            .ok()
    });

    let make_writer = || -> BoxMakeWriter {
        if let Some(file) = file.as_ref().and_then(|inner| inner.try_clone().ok()) {
            BoxMakeWriter::new(file)
        } else {
            BoxMakeWriter::new(std::io::stderr)
        }
    };

    let make_filter = || {
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(crate_filter(LogLevel::default())))
    };

    match settings.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(make_filter())
                .json()
                .with_writer(make_writer())
                .with_span_events(FmtSpan::CLOSE)
                .try_init()
                .ok();
        }
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(make_filter())
                .compact()
                .with_writer(make_writer())
                .with_target(true)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt()
                .with_env_filter(make_filter())
                .with_writer(make_writer())
                .with_target(false)
                .without_time()
                .try_init()
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_to_warn_on_stderr() {
        let settings = LogSettings::resolve_with(None, false, false, env(&[]));
        assert_eq!(settings.filter, "lra=warn");
        assert_eq!(settings.format, LogFormat::Human);
        assert!(settings.file.is_none());
    }

    #[test]
    fn verbose_raises_default_level() {
        let settings = LogSettings::resolve_with(None, false, true, env(&[]));
        assert_eq!(settings.filter, "lra=debug");
    }

    #[test]
    fn env_level_and_format() {
        let settings = LogSettings::resolve_with(
            None,
            false,
            false,
            env(&[(LOG_LEVEL_ENV, "trace"), (LOG_FORMAT_ENV, "JSON")]),
        );
        assert_eq!(settings.filter, "lra=trace");
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn env_directive_passes_through() {
        let settings = LogSettings::resolve_with(
            None,
            false,
            false,
            env(&[(LOG_LEVEL_ENV, "lra=debug,reqwest=info")]),
        );
        assert_eq!(settings.filter, "lra=debug,reqwest=info");
    }

    #[test]
    fn cli_wins_over_env() {
        let settings = LogSettings::resolve_with(
            Some(LogLevel::Error),
            true,
            false,
            env(&[(LOG_LEVEL_ENV, "trace"), (LOG_FORMAT_ENV, "compact")]),
        );
        assert_eq!(settings.filter, "lra=error");
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn log_file_from_env() {
        let settings =
            LogSettings::resolve_with(None, false, false, env(&[(LOG_FILE_ENV, " /tmp/lra.log ")]));
        assert_eq!(settings.file, Some(PathBuf::from("/tmp/lra.log")));
    }

    #[test]
    fn level_parsing() {
        assert_eq!(LogLevel::from_arg("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_arg("verbose"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_arg("loud"), None);
        assert_eq!(LogLevel::Info.as_tracing_level(), Level::INFO);
    }
}
