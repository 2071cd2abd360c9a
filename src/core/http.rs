//! HTTP transport utilities.
//!
//! Builds the shared `reqwest` client and performs single request attempts,
//! mapping transport failures and HTTP statuses onto [`LraError`] so the
//! retry policy can classify them. Nothing here retries.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, StatusCode, Url};

use crate::error::{LraError, Result, TimeoutPhase};

/// Default upstream base URL (CourtListener REST v4).
pub const DEFAULT_BASE_URL: &str = "https://www.courtlistener.com/api/rest/v4/";

/// Longest error body excerpt kept in a [`LraError::ClientRequest`].
const MAX_ERROR_BODY: usize = 200;

/// Timeouts applied to every upstream request.
///
/// `total` bounds the whole exchange, including sending the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub total: Duration,
    pub connect: Duration,
    pub read: Duration,
    pub pool_idle: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(30),
            connect: Duration::from_secs(10),
            read: Duration::from_secs(60),
            pool_idle: Duration::from_secs(90),
        }
    }
}

/// Build a configured HTTP client.
///
/// When `api_key` is given every request carries `Authorization: Token <key>`.
///
/// # Errors
///
/// Returns error if the key is not a valid header value or client
/// construction fails.
pub fn build_client(timeouts: &HttpTimeouts, api_key: Option<&str>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key {
        let mut value = HeaderValue::from_str(&format!("Token {key}"))
            .map_err(|e| LraError::Config(format!("Invalid API key: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    ClientBuilder::new()
        .timeout(timeouts.total)
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.read)
        .pool_idle_timeout(timeouts.pool_idle)
        .default_headers(headers)
        .user_agent(format!("lra/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| LraError::Network(e.to_string()))
}

/// Join `path` onto `base` and append query pairs.
///
/// # Errors
///
/// Returns error if the base URL or joined path is not a valid URL.
pub fn endpoint_url(base: &str, path: &str, pairs: &[(&str, String)]) -> Result<Url> {
    let base = if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{base}/"))
    }
    .map_err(|e| LraError::Config(format!("Invalid base URL '{base}': {e}")))?;

    let mut url = base
        .join(path.trim_start_matches('/'))
        .map_err(|e| LraError::Config(format!("Invalid endpoint path '{path}': {e}")))?;
    if !pairs.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
}

/// Perform one GET and return the response body.
///
/// `timeouts` must be the ones the client was built with; they are used to
/// name the budget that ran out in a [`LraError::Timeout`].
///
/// # Errors
///
/// - [`LraError::Timeout`], [`LraError::ConnectionFailed`],
///   [`LraError::Network`] for transport failures (including a body read that
///   is interrupted)
/// - [`LraError::RateLimited`] for HTTP 429
/// - [`LraError::UpstreamUnavailable`] for HTTP 5xx
/// - [`LraError::ClientRequest`] for any other non-success status
pub async fn fetch_text(client: &Client, url: &Url, timeouts: &HttpTimeouts) -> Result<String> {
    let started = Instant::now();
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| transport_error(&e, url, timeouts, started.elapsed()))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LraError::RateLimited {
            url: url.to_string(),
            retry_after: parse_retry_after(response.headers(), Utc::now()),
        });
    }
    if status.is_server_error() {
        return Err(LraError::UpstreamUnavailable {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LraError::ClientRequest {
            status: status.as_u16(),
            url: url.to_string(),
            message: excerpt(&body),
        });
    }

    response
        .text()
        .await
        .map_err(|e| transport_error(&e, url, timeouts, started.elapsed()))
}

/// Perform one GET and decode the body as JSON.
///
/// # Errors
///
/// Same as [`fetch_text`], plus [`LraError::ParseResponse`] when the body is
/// not valid JSON for `T`.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &Url,
    timeouts: &HttpTimeouts,
) -> Result<T> {
    let body = fetch_text(client, url, timeouts).await?;
    serde_json::from_str(&body).map_err(|e| LraError::ParseResponse(format!("{url}: {e}")))
}

fn transport_error(
    err: &reqwest::Error,
    url: &Url,
    timeouts: &HttpTimeouts,
    elapsed: Duration,
) -> LraError {
    if err.is_timeout() {
        let phase = timeout_phase(err.is_connect(), elapsed, timeouts);
        let budget = match phase {
            TimeoutPhase::Connect => timeouts.connect,
            TimeoutPhase::Read => timeouts.read,
            TimeoutPhase::Total => timeouts.total,
        };
        LraError::Timeout {
            url: url.to_string(),
            phase,
            seconds: budget.as_secs_f64(),
        }
    } else if err.is_connect() {
        LraError::ConnectionFailed {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        LraError::Network(err.to_string())
    }
}

/// reqwest flags connect timeouts; of the rest, one that fired once the total
/// budget was spent is the total timeout and anything earlier is a read stall.
fn timeout_phase(during_connect: bool, elapsed: Duration, timeouts: &HttpTimeouts) -> TimeoutPhase {
    if during_connect {
        TimeoutPhase::Connect
    } else if elapsed >= timeouts.total {
        TimeoutPhase::Total
    } else {
        TimeoutPhase::Read
    }
}

/// Parse `Retry-After` as delta-seconds or an HTTP date.
fn parse_retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok()
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_joins_and_encodes() {
        let url = endpoint_url(
            "https://example.test/api/rest/v4",
            "/search/",
            &[("q", "\"410 U.S. 113\"".to_string()), ("type", "o".to_string())],
        )
        .unwrap();
        assert_eq!(url.path(), "/api/rest/v4/search/");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("q".to_string(), "\"410 U.S. 113\"".to_string()));
        assert_eq!(pairs[1], ("type".to_string(), "o".to_string()));
    }

    #[test]
    fn endpoint_url_without_query() {
        let url = endpoint_url(DEFAULT_BASE_URL, "opinions/42/", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.courtlistener.com/api/rest/v4/opinions/42/"
        );
    }

    #[test]
    fn endpoint_url_rejects_garbage_base() {
        assert!(matches!(
            endpoint_url("not a url", "search/", &[]),
            Err(LraError::Config(_))
        ));
    }

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(
            parse_retry_after(&headers, Utc::now()),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn retry_after_http_date() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:29:30 GMT"),
        );
        assert_eq!(
            parse_retry_after(&headers, now),
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn retry_after_garbage_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers, Utc::now()), None);
        assert_eq!(parse_retry_after(&HeaderMap::new(), Utc::now()), None);
    }

    #[test]
    fn timeout_phase_classification() {
        let timeouts = HttpTimeouts {
            total: Duration::from_secs(30),
            connect: Duration::from_secs(10),
            read: Duration::from_secs(5),
            pool_idle: Duration::from_secs(90),
        };
        assert_eq!(
            timeout_phase(true, Duration::from_secs(10), &timeouts),
            TimeoutPhase::Connect
        );
        assert_eq!(
            timeout_phase(false, Duration::from_secs(30), &timeouts),
            TimeoutPhase::Total
        );
        assert_eq!(
            timeout_phase(false, Duration::from_secs(6), &timeouts),
            TimeoutPhase::Read
        );
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        let short = excerpt(&long);
        assert_eq!(short.len(), MAX_ERROR_BODY + 3);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("  not found "), "not found");
    }

    #[test]
    fn build_client_accepts_key() {
        assert!(build_client(&HttpTimeouts::default(), Some("abc123")).is_ok());
        assert!(build_client(&HttpTimeouts::default(), None).is_ok());
    }

    #[test]
    fn build_client_rejects_header_breaking_key() {
        assert!(build_client(&HttpTimeouts::default(), Some("bad\nkey")).is_err());
    }
}
