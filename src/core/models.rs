//! Typed requests and results for the CourtListener operations.
//!
//! Opinion and case records stay opaque `serde_json::Value`s; the upstream
//! schema is wide and callers pick the fields they need.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{LraError, Result};
use crate::storage::cache::CacheKey;

/// Opinion fields holding the opinion text, in order of preference.
pub const TEXT_FIELDS: &[&str] = &[
    "plain_text",
    "html_lawbox",
    "html",
    "html_columbia",
    "html_anon_2020",
];

/// Largest page the search endpoint serves (`hit`).
pub const MAX_SEARCH_HITS: u32 = 100;
/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
/// Default search ordering.
pub const DEFAULT_ORDER_BY: &str = "score desc";

// =============================================================================
// Search
// =============================================================================

/// Parameters for an opinion search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filed_after: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filed_before: Option<NaiveDate>,
    /// Only opinions cited more than this many times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cited_gt: Option<u32>,
    /// Only opinions cited fewer than this many times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cited_lt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    pub limit: u32,
}

impl SearchParams {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            court: None,
            case_name: None,
            judge: None,
            filed_after: None,
            filed_before: None,
            cited_gt: None,
            cited_lt: None,
            order_by: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    #[must_use]
    pub fn with_court(mut self, court: impl Into<String>) -> Self {
        self.court = Some(court.into());
        self
    }

    #[must_use]
    pub fn with_case_name(mut self, case_name: impl Into<String>) -> Self {
        self.case_name = Some(case_name.into());
        self
    }

    #[must_use]
    pub fn with_judge(mut self, judge: impl Into<String>) -> Self {
        self.judge = Some(judge.into());
        self
    }

    #[must_use]
    pub const fn with_filed_after(mut self, date: NaiveDate) -> Self {
        self.filed_after = Some(date);
        self
    }

    #[must_use]
    pub const fn with_filed_before(mut self, date: NaiveDate) -> Self {
        self.filed_before = Some(date);
        self
    }

    #[must_use]
    pub const fn with_cited_gt(mut self, count: u32) -> Self {
        self.cited_gt = Some(count);
        self
    }

    #[must_use]
    pub const fn with_cited_lt(mut self, count: u32) -> Self {
        self.cited_lt = Some(count);
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Page size sent upstream.
    #[must_use]
    pub fn hits(&self) -> u32 {
        self.limit.min(MAX_SEARCH_HITS)
    }

    /// Reject parameters the upstream would refuse or silently ignore.
    ///
    /// # Errors
    ///
    /// Returns [`LraError::InvalidRequest`] for an empty query, a zero limit,
    /// or an inverted date or citation-count range.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(LraError::InvalidRequest("query must not be empty".to_string()));
        }
        if self.limit == 0 {
            return Err(LraError::InvalidRequest("limit must be at least 1".to_string()));
        }
        if let (Some(after), Some(before)) = (self.filed_after, self.filed_before) {
            if after > before {
                return Err(LraError::InvalidRequest(format!(
                    "filed_after ({after}) is later than filed_before ({before})"
                )));
            }
        }
        if let (Some(gt), Some(lt)) = (self.cited_gt, self.cited_lt) {
            if gt >= lt {
                return Err(LraError::InvalidRequest(format!(
                    "cited_gt ({gt}) must be below cited_lt ({lt})"
                )));
            }
        }
        Ok(())
    }

    /// Upstream query parameters, in a stable order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.query.clone()),
            ("type", "o".to_string()),
            (
                "order_by",
                self.order_by
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ORDER_BY.to_string()),
            ),
        ];
        let optional = [
            ("court", self.court.clone()),
            ("case_name", self.case_name.clone()),
            ("judge", self.judge.clone()),
            ("filed_after", self.filed_after.map(|d| d.to_string())),
            ("filed_before", self.filed_before.map(|d| d.to_string())),
            ("cited_gt", self.cited_gt.map(|n| n.to_string())),
            ("cited_lt", self.cited_lt.map(|n| n.to_string())),
        ];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v))),
        );
        pairs.push(("hit", self.hits().to_string()));
        pairs
    }

    /// Cache key over the final upstream parameter map.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        let map: Map<String, Value> = self
            .query_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v)))
            .collect();
        CacheKey::params(Value::Object(map))
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<Value>,
    /// Any other fields the upstream sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Citation lookup
// =============================================================================

/// How a lookup picked its case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationMatch {
    /// The case lists the citation among its own citations.
    Citation,
    /// No case listed the citation; the oldest result was taken.
    OldestResult,
}

/// Outcome of resolving a citation to a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CitationLookup {
    Found {
        citation: String,
        matched_by: CitationMatch,
        case: Value,
    },
    NotFound {
        citation: String,
    },
}

impl CitationLookup {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// The matched case record, if any.
    #[must_use]
    pub const fn case(&self) -> Option<&Value> {
        match self {
            Self::Found { case, .. } => Some(case),
            Self::NotFound { .. } => None,
        }
    }

    #[must_use]
    pub fn citation(&self) -> &str {
        match self {
            Self::Found { citation, .. } | Self::NotFound { citation } => citation,
        }
    }

    /// Pick the case a citation refers to from date-ascending search results.
    #[must_use]
    pub fn select(citation: &str, results: &[Value]) -> Self {
        let target = normalize_citation(citation);
        if let Some(case) = results.iter().find(|case| {
            case_citations(case)
                .iter()
                .any(|c| normalize_citation(c) == target)
        }) {
            return Self::Found {
                citation: citation.to_string(),
                matched_by: CitationMatch::Citation,
                case: case.clone(),
            };
        }
        results.first().map_or_else(
            || Self::NotFound {
                citation: citation.to_string(),
            },
            |case| Self::Found {
                citation: citation.to_string(),
                matched_by: CitationMatch::OldestResult,
                case: case.clone(),
            },
        )
    }
}

/// Strip whitespace and lowercase, so `410 U.S. 113` equals `410 u.s.113`.
#[must_use]
pub fn normalize_citation(citation: &str) -> String {
    citation
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A case's own citations (`citation` field, list or single string).
#[must_use]
pub fn case_citations(case: &Value) -> Vec<&str> {
    match case.get("citation") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}

// =============================================================================
// Opinion text
// =============================================================================

/// First non-empty text field of an opinion, with its name.
#[must_use]
pub fn select_text(opinion: &Value) -> Option<(&'static str, &str)> {
    TEXT_FIELDS.iter().find_map(|field| {
        opinion
            .get(*field)
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(|text| (*field, text))
    })
}

// =============================================================================
// Partial results
// =============================================================================

/// One query formulation that failed outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    pub category: String,
    pub error_code: String,
}

impl FailureRecord {
    #[must_use]
    pub fn from_error(query: impl Into<String>, err: &LraError) -> Self {
        let url = match err {
            LraError::Timeout { url, .. }
            | LraError::ConnectionFailed { url, .. }
            | LraError::RateLimited { url, .. }
            | LraError::UpstreamUnavailable { url, .. }
            | LraError::ClientRequest { url, .. } => Some(url.clone()),
            _ => None,
        };
        Self {
            query: query.into(),
            url,
            status: err.status_code(),
            message: err.to_string(),
            category: err.category().to_string(),
            error_code: err.error_code().to_string(),
        }
    }
}

/// Results from a multi-query operation where some queries may have failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialResult<T> {
    pub results: Vec<T>,
    pub failed_attempts: Vec<FailureRecord>,
    /// True when any query failed outright.
    pub incomplete: bool,
    /// Successful queries over queries attempted, two decimals.
    pub confidence: f64,
    pub warnings: Vec<String>,
}

impl<T> PartialResult<T> {
    /// Assemble a result from per-query bookkeeping.
    ///
    /// `attempts` counts every query sent; failures are in `failed_attempts`.
    #[must_use]
    pub fn from_attempts(
        results: Vec<T>,
        failed_attempts: Vec<FailureRecord>,
        warnings: Vec<String>,
        attempts: u32,
    ) -> Self {
        let failed = u32::try_from(failed_attempts.len()).unwrap_or(u32::MAX);
        let successful = attempts.saturating_sub(failed);
        Self {
            results,
            incomplete: !failed_attempts.is_empty(),
            confidence: confidence(successful, attempts),
            failed_attempts,
            warnings,
        }
    }
}

/// `successful / total` rounded to two decimals; 1.0 when nothing was tried.
#[must_use]
pub fn confidence(successful: u32, total: u32) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let ratio = f64::from(successful.min(total)) / f64::from(total);
    (ratio * 100.0).round() / 100.0
}

/// Drop repeated records (same `id`, else same `absolute_url`) keeping the
/// first occurrence, then truncate to `limit`.
#[must_use]
pub fn dedup_results(results: Vec<Value>, limit: usize) -> Vec<Value> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|record| dedup_key(record).is_none_or(|key| seen.insert(key)))
        .take(limit)
        .collect()
}

fn dedup_key(record: &Value) -> Option<String> {
    match record.get("id") {
        Some(Value::Number(n)) => return Some(format!("id:{n}")),
        Some(Value::String(s)) if !s.is_empty() => return Some(format!("id:{s}")),
        _ => {}
    }
    record
        .get("absolute_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(|url| format!("url:{url}"))
}

/// Cache key for a citation lookup.
#[must_use]
pub fn citation_lookup_key(citation: &str) -> CacheKey {
    CacheKey::params(json!({ "citation_lookup": citation }))
}

/// Cache key for a citing-cases query.
#[must_use]
pub fn citing_cases_key(citation: &str, limit: u32) -> CacheKey {
    CacheKey::params(json!({ "citing_cases": citation, "limit": limit }))
}

/// Cache key for opinion metadata.
#[must_use]
pub fn opinion_key(opinion_id: u64) -> CacheKey {
    CacheKey::params(json!({ "opinion_id": opinion_id }))
}

/// Cache key for opinion full text.
#[must_use]
pub fn full_text_key(opinion_id: u64) -> CacheKey {
    CacheKey::params(json!({ "opinion_id": opinion_id, "field": "full_text" }))
}
