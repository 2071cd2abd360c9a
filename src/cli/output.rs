//! Output rendering: JSON results to stdout, errors to stderr.

use serde::Serialize;

use crate::error::LraError;

/// Serialize a command result.
///
/// # Errors
///
/// Returns [`LraError::Json`] if the value cannot be serialized.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> crate::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Print a command result to stdout.
///
/// # Errors
///
/// Returns [`LraError::Json`] if the value cannot be serialized.
pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> crate::Result<()> {
    println!("{}", to_json(value, pretty)?);
    Ok(())
}

/// Plain text error: header line plus the first fix command and its context.
#[must_use]
pub fn render_error_text(error: &LraError) -> String {
    let suggestions = error.fix_suggestions();
    let mut lines = vec![format!("Error [{}]: {}", error.error_code(), error)];

    if let Some(suggestion) = suggestions.first() {
        if let Some(cmd) = suggestion.commands.first() {
            lines.push(format!("Fix: {cmd}"));
        }
        if !suggestion.context.is_empty() {
            lines.push(format!("Why: {}", suggestion.context));
        }
        if let Some(prevention) = &suggestion.prevention {
            lines.push(format!("Tip: {prevention}"));
        }
    }

    lines.join("\n")
}

/// JSON representation of an error for machine consumption.
#[derive(Serialize)]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    is_retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
    suggestions: Vec<SuggestionJson>,
}

#[derive(Serialize)]
struct SuggestionJson {
    commands: Vec<String>,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prevention: Option<String>,
}

/// Structured error for scripts.
#[must_use]
pub fn render_error_json(error: &LraError, pretty: bool) -> String {
    let payload = ErrorJson {
        error_code: error.error_code(),
        category: error.category().to_string(),
        message: error.to_string(),
        is_retryable: error.is_retryable(),
        status: error.status_code(),
        retry_after_seconds: error.retry_after().map(|d| d.as_secs()),
        suggestions: error
            .fix_suggestions()
            .into_iter()
            .map(|s| SuggestionJson {
                commands: s.commands,
                context: s.context,
                prevention: s.prevention,
            })
            .collect(),
    };
    to_json(&payload, pretty).unwrap_or_else(|_| render_error_text(error))
}
