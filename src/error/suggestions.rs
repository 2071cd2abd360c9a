//! Fix suggestion database for lra errors.
//!
//! Provides actionable fix suggestions mapped to specific error types,
//! including commands, context explanations, and prevention tips.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::TimeoutPhase;
use crate::storage::config::{ENV_API_KEY, ENV_TIMEOUT};

/// A fix suggestion for an error.
#[derive(Debug, Clone)]
pub struct FixSuggestion {
    /// Commands to run, copy-paste ready.
    pub commands: Vec<String>,

    /// Explanation of why this error occurred.
    pub context: String,

    /// Tips to prevent this error in the future.
    pub prevention: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }
}

/// Suggestions for a request that exceeded one of its time budgets.
///
/// Only the total budget has an environment override; connect and read
/// budgets are raised in the config file.
#[must_use]
pub fn timeout_suggestions(url: &str, phase: TimeoutPhase, seconds: f64) -> Vec<FixSuggestion> {
    let command = match phase {
        TimeoutPhase::Total => format!("{ENV_TIMEOUT}={} lra <command>", (seconds * 2.0).ceil()),
        TimeoutPhase::Connect | TimeoutPhase::Read => format!("curl -I {url}"),
    };
    let context = match phase {
        TimeoutPhase::Connect => format!("Connecting to {url} took longer than {seconds}s."),
        TimeoutPhase::Read => format!("{url} sent nothing for longer than {seconds}s."),
        TimeoutPhase::Total => format!("The request to {url} did not complete within {seconds}s."),
    };
    vec![
        FixSuggestion::new(vec![command], context)
        .with_prevention(format!(
            "Raise {} in config.toml for slow connections.",
            phase.config_key()
        )),
    ]
}

/// Suggestions for a connection that could not be established.
#[must_use]
pub fn connection_failed_suggestions(url: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("curl -I {url}")],
        "The upstream host could not be reached. Check your network connection and api.base_url.",
    )]
}

/// Suggestions for HTTP 429 responses.
#[must_use]
pub fn rate_limited_suggestions(retry_after: Option<Duration>) -> Vec<FixSuggestion> {
    let context = retry_after.map_or_else(
        || "The upstream is rate limiting requests.".to_string(),
        |wait| {
            format!(
                "The upstream is rate limiting requests. Retry in {}s.",
                wait.as_secs()
            )
        },
    );
    vec![
        FixSuggestion::new(vec![format!("export {ENV_API_KEY}=<your token>")], context)
            .with_prevention("Authenticated requests get a higher rate limit."),
    ]
}

/// Suggestions for 5xx responses that outlasted the retry budget.
#[must_use]
pub fn upstream_unavailable_suggestions(status: u16) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["lra cache stats".to_string()],
        format!("The upstream kept answering HTTP {status}. Cached results remain available."),
    )]
}

/// Suggestions for rejected requests.
#[must_use]
pub fn client_request_suggestions(status: u16) -> Vec<FixSuggestion> {
    match status {
        401 | 403 => vec![
            FixSuggestion::new(
                vec![format!("export {ENV_API_KEY}=<your token>")],
                "The upstream rejected the credentials (or none were configured).",
            )
            .with_prevention("Store the token under [api] api_key in config.toml."),
        ],
        404 => vec![FixSuggestion::new(
            vec!["lra search \"<case name>\"".to_string()],
            "The requested record does not exist upstream. Check the opinion id or citation.",
        )],
        _ => vec![FixSuggestion::new(
            Vec::new(),
            format!("The upstream rejected the request with HTTP {status}."),
        )],
    }
}

/// Suggestions while the circuit breaker is open.
#[must_use]
pub fn circuit_open_suggestions(until: DateTime<Utc>) -> Vec<FixSuggestion> {
    let wait = (until - Utc::now()).num_seconds().max(0);
    vec![FixSuggestion::new(
        vec!["lra cache stats".to_string()],
        format!(
            "Too many consecutive upstream failures; requests are paused for another {wait}s."
        ),
    )
    .with_prevention("Tune [circuit_breaker] failure_threshold and cooldown_seconds.")]
}

/// Suggestions for a config file that failed to parse.
#[must_use]
pub fn config_parse_suggestions(path: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("$EDITOR {path}")],
        "The config file is not valid TOML.",
    )]
}

/// Suggestions for an invalid config value.
#[must_use]
pub fn config_invalid_suggestions(key: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        Vec::new(),
        format!("Fix the value of '{key}' in config.toml or the matching environment variable."),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_mentions_retry_after() {
        let suggestions = rate_limited_suggestions(Some(Duration::from_secs(42)));
        assert!(suggestions[0].context.contains("42s"));
    }

    #[test]
    fn auth_failures_point_at_api_key() {
        let suggestions = client_request_suggestions(401);
        assert!(suggestions[0].commands[0].contains(ENV_API_KEY));
    }

    #[test]
    fn timeout_doubles_budget() {
        let suggestions = timeout_suggestions("https://example.test", TimeoutPhase::Total, 30.0);
        assert!(suggestions[0].commands[0].contains("=60 "));
        assert!(suggestions[0].prevention.is_some());
    }

    #[test]
    fn sub_second_timeout_rounds_suggestion_up() {
        let suggestions = timeout_suggestions("https://example.test", TimeoutPhase::Total, 0.2);
        assert!(suggestions[0].commands[0].starts_with(&format!("{ENV_TIMEOUT}=1 ")));
        assert!(suggestions[0].context.contains("0.2s"));
    }

    #[test]
    fn connect_timeout_points_at_connect_budget() {
        let suggestions = timeout_suggestions("https://example.test", TimeoutPhase::Connect, 10.0);
        assert!(!suggestions[0].commands[0].contains(ENV_TIMEOUT));
        assert!(
            suggestions[0]
                .prevention
                .as_deref()
                .is_some_and(|tip| tip.contains("api.connect_timeout_seconds"))
        );
    }
}
