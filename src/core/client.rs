//! Resilient CourtListener client.
//!
//! Every operation follows the same shape: build a cache key, return a fresh
//! cache hit, otherwise call the upstream through the circuit breaker and the
//! retry policy, then populate the cache from the parsed response.
//!
//! One client is meant to be shared (`&self` methods, `Send + Sync`); all
//! requests through it feed the same circuit breaker.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::circuit_breaker::{CircuitBreaker, CircuitState};
use super::http::{self, HttpTimeouts};
use super::models::{
    CitationLookup, FailureRecord, PartialResult, SearchParams, SearchResponse,
    citation_lookup_key, citing_cases_key, dedup_results, full_text_key, opinion_key, select_text,
};
use super::retry::{AttemptOutcome, RetryDecision, RetryPolicy};
use crate::error::{LraError, Result};
use crate::storage::cache::{CacheCategory, TtlCache};
use crate::storage::config::Config;

/// Results requested by a citation lookup.
const LOOKUP_HITS: u32 = 20;
/// Oldest first, so the fallback is the earliest case.
const LOOKUP_ORDER: &str = "dateFiled asc";
/// Newest first.
const CITING_ORDER: &str = "dateFiled desc";

/// Client for the CourtListener REST API with caching, retries and a circuit
/// breaker.
#[derive(Debug)]
pub struct ResilientClient {
    http: reqwest::Client,
    base_url: String,
    timeouts: HttpTimeouts,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    cache: TtlCache,
    search_cache_enabled: bool,
    has_api_key: bool,
}

impl ResilientClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the config does not validate or the
    /// HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let timeouts = config.timeouts()?;
        let api_key = config
            .api
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());
        if api_key.is_none() {
            tracing::warn!("No CourtListener API key configured; requests are unauthenticated");
        }

        let cache = TtlCache::from_config(config);

        tracing::debug!(
            base_url = %config.api.base_url,
            cache_enabled = cache.is_enabled(),
            cache_dir = %cache.base_dir().display(),
            "CourtListener client initialized"
        );

        Ok(Self {
            http: http::build_client(&timeouts, api_key)?,
            base_url: config.api.base_url.clone(),
            timeouts,
            retry: config.retry_policy()?,
            breaker: CircuitBreaker::new(config.breaker_config()?),
            cache,
            search_cache_enabled: config.cache.search_enabled,
            has_api_key: api_key.is_some(),
        })
    }

    #[must_use]
    pub const fn cache(&self) -> &TtlCache {
        &self.cache
    }

    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Whether requests carry an `Authorization` header.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.has_api_key
    }

    /// Search opinions.
    ///
    /// # Errors
    ///
    /// Returns [`LraError::InvalidRequest`] for invalid parameters,
    /// [`LraError::CircuitOpen`] while the breaker is open, or the last
    /// upstream error once retries are exhausted.
    pub async fn search_opinions(&self, params: &SearchParams) -> Result<SearchResponse> {
        params.validate()?;
        let key = params.cache_key();
        if self.search_cache_enabled {
            if let Some(cached) = self.cache.get::<SearchResponse>(CacheCategory::Search, &key) {
                tracing::debug!(operation = "search_opinions", query = %params.query, "Serving cached search");
                return Ok(cached);
            }
        }

        let response = self.fetch_search("search_opinions", params).await?;
        if self.search_cache_enabled {
            self.cache.set(CacheCategory::Search, &key, &response);
        }
        tracing::info!(
            operation = "search_opinions",
            query = %params.query,
            results = response.results.len(),
            "Opinion search completed"
        );
        Ok(response)
    }

    /// Fetch one opinion's metadata record.
    ///
    /// # Errors
    ///
    /// Returns [`LraError::ClientRequest`] (404) for an unknown id, plus the
    /// failures described on [`search_opinions`](Self::search_opinions).
    pub async fn get_opinion(&self, opinion_id: u64) -> Result<Value> {
        let key = opinion_key(opinion_id);
        if let Some(cached) = self.cache.get::<Value>(CacheCategory::Metadata, &key) {
            return Ok(cached);
        }

        let url = http::endpoint_url(&self.base_url, &format!("opinions/{opinion_id}/"), &[])?;
        let opinion: Value = self.execute("get_opinion", &url).await?;
        self.cache.set(CacheCategory::Metadata, &key, &opinion);
        tracing::info!(operation = "get_opinion", opinion_id, "Opinion fetched");
        Ok(opinion)
    }

    /// Fetch an opinion's text from the first populated text field.
    ///
    /// Returns an empty string when the opinion has no text.
    ///
    /// # Errors
    ///
    /// Same as [`get_opinion`](Self::get_opinion).
    pub async fn get_opinion_full_text(&self, opinion_id: u64) -> Result<String> {
        let key = full_text_key(opinion_id);
        if let Some(text) = self.cache.get_text(CacheCategory::Text, &key) {
            return Ok(text);
        }

        let opinion = self.get_opinion(opinion_id).await?;
        match select_text(&opinion) {
            Some((field, text)) => {
                tracing::info!(
                    operation = "get_opinion_full_text",
                    opinion_id,
                    field,
                    chars = text.len(),
                    "Opinion text retrieved"
                );
                self.cache.set_text(CacheCategory::Text, &key, text);
                Ok(text.to_string())
            }
            None => {
                tracing::warn!(
                    operation = "get_opinion_full_text",
                    opinion_id,
                    "No text content found for opinion"
                );
                Ok(String::new())
            }
        }
    }

    /// Resolve a citation such as `410 U.S. 113` to the case it names.
    ///
    /// # Errors
    ///
    /// Returns [`LraError::InvalidRequest`] for a blank citation, plus the
    /// failures described on [`search_opinions`](Self::search_opinions).
    pub async fn lookup_citation(&self, citation: &str) -> Result<CitationLookup> {
        let citation = citation.trim();
        if citation.is_empty() {
            return Err(LraError::InvalidRequest("citation must not be empty".to_string()));
        }
        let key = citation_lookup_key(citation);
        if self.search_cache_enabled {
            if let Some(cached) = self.cache.get::<CitationLookup>(CacheCategory::Search, &key) {
                return Ok(cached);
            }
        }

        let params = SearchParams::new(format!("\"{citation}\""))
            .with_order_by(LOOKUP_ORDER)
            .with_limit(LOOKUP_HITS);
        let response = self.fetch_search("lookup_citation", &params).await?;
        let lookup = CitationLookup::select(citation, &response.results);

        match &lookup {
            CitationLookup::Found { matched_by, .. } => {
                tracing::info!(
                    operation = "lookup_citation",
                    query = citation,
                    matched_by = ?matched_by,
                    "Citation resolved"
                );
                if self.search_cache_enabled {
                    self.cache.set(CacheCategory::Search, &key, &lookup);
                }
            }
            CitationLookup::NotFound { .. } => {
                tracing::info!(operation = "lookup_citation", query = citation, "Citation not found");
            }
        }
        Ok(lookup)
    }

    /// Find cases citing `citation`, trying a quoted then an unquoted query.
    ///
    /// A query that fails outright is recorded in `failed_attempts` and the
    /// next one is tried; the first query that returns results ends the
    /// search.
    ///
    /// # Errors
    ///
    /// Returns [`LraError::InvalidRequest`] for a blank citation or a zero
    /// limit, and [`LraError::CircuitOpen`] while the breaker is open. Other
    /// upstream failures are reported inside the result.
    pub async fn find_citing_cases(&self, citation: &str, limit: u32) -> Result<PartialResult<Value>> {
        let citation = citation.trim();
        if citation.is_empty() {
            return Err(LraError::InvalidRequest("citation must not be empty".to_string()));
        }
        if limit == 0 {
            return Err(LraError::InvalidRequest("limit must be at least 1".to_string()));
        }
        let key = citing_cases_key(citation, limit);
        if let Some(cached) = self.cache.get::<PartialResult<Value>>(CacheCategory::Search, &key) {
            return Ok(cached);
        }

        let formulations = [format!("\"{citation}\""), citation.to_string()];
        let mut found = Vec::new();
        let mut failed = Vec::new();
        let mut warnings = Vec::new();
        let mut attempts = 0;

        for query in formulations {
            attempts += 1;
            let params = SearchParams::new(query.as_str())
                .with_order_by(CITING_ORDER)
                .with_limit(limit);
            match self.fetch_search("find_citing_cases", &params).await {
                Ok(response) if !response.results.is_empty() => {
                    tracing::debug!(
                        operation = "find_citing_cases",
                        query = %query,
                        results = response.results.len(),
                        "Found citing cases"
                    );
                    found = response.results;
                    break;
                }
                Ok(_) => {
                    tracing::debug!(operation = "find_citing_cases", query = %query, "Query returned no results, trying next");
                    warnings.push(format!("Query '{query}' returned no results."));
                }
                Err(err @ LraError::CircuitOpen { .. }) => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        operation = "find_citing_cases",
                        query = %query,
                        status = err.status_code(),
                        error = %err,
                        "Query failed, trying next"
                    );
                    warnings.push(format!("Query '{query}' failed: {err}"));
                    failed.push(FailureRecord::from_error(query.as_str(), &err));
                }
            }
        }

        let results = dedup_results(found, usize::try_from(limit).unwrap_or(usize::MAX));
        if results.is_empty() {
            warnings.push("No citing cases were found across all query attempts.".to_string());
        }
        let result = PartialResult::from_attempts(results, failed, warnings, attempts);
        if !result.incomplete {
            self.cache.set(CacheCategory::Search, &key, &result);
        }
        tracing::info!(
            operation = "find_citing_cases",
            query = citation,
            results = result.results.len(),
            failed = result.failed_attempts.len(),
            confidence = result.confidence,
            "Citing case search completed"
        );
        Ok(result)
    }

    async fn fetch_search(&self, operation: &'static str, params: &SearchParams) -> Result<SearchResponse> {
        params.validate()?;
        let url = http::endpoint_url(&self.base_url, "search/", &params.query_pairs())?;
        self.execute(operation, &url).await
    }

    /// Run one request under the breaker and the retry policy.
    ///
    /// Every attempt reports to the breaker: transport failures, 429 and 5xx
    /// as failures, anything the upstream actually answered as a success.
    /// A 4xx or an unparsable body therefore counts as a success. It says
    /// the upstream is reachable, so a run of bad requests (an unknown
    /// opinion id, a revoked key) never opens the circuit for every other
    /// caller. This departs from counting each failed request as a breaker
    /// failure.
    async fn execute<T: DeserializeOwned>(&self, operation: &'static str, url: &reqwest::Url) -> Result<T> {
        let mut attempt = 0;
        loop {
            let permit = self.breaker.try_acquire().inspect_err(|_| {
                tracing::warn!(operation, state = "open", "Circuit breaker rejected request");
            })?;
            attempt += 1;
            tracing::debug!(operation, attempt, url = %url, trial = permit.is_trial(), "Sending request");

            match AttemptOutcome::from_result(http::fetch_json(&self.http, url, &self.timeouts).await) {
                AttemptOutcome::Success(value) => {
                    permit.record_success();
                    return Ok(value);
                }
                AttemptOutcome::FatalFailure(err) => {
                    permit.record_success();
                    tracing::warn!(operation, attempt, status = err.status_code(), error = %err, "Request failed");
                    return Err(err);
                }
                AttemptOutcome::RetryableFailure(err) => {
                    permit.record_failure();
                    match self.retry.decide(&err, attempt) {
                        RetryDecision::GiveUp => {
                            tracing::warn!(operation, attempt, status = err.status_code(), error = %err, "Retries exhausted");
                            return Err(err);
                        }
                        RetryDecision::RetryAfter(delay) => {
                            if let CircuitState::Open { until } = self.breaker.state() {
                                tracing::warn!(operation, attempt, state = "open", "Circuit opened during retries");
                                return Err(LraError::CircuitOpen { until });
                            }
                            tracing::warn!(
                                operation,
                                attempt,
                                status = err.status_code(),
                                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                                retry_after_s = err.retry_after().map(|d| d.as_secs()),
                                error = %err,
                                "Request failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
    }
}
