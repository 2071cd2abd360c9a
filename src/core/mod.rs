//! Resilient access to the CourtListener API.

pub mod circuit_breaker;
pub mod client;
pub mod http;
pub mod logging;
pub mod models;
pub mod retry;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::ResilientClient;
pub use models::{
    CitationLookup, CitationMatch, FailureRecord, PartialResult, SearchParams, SearchResponse,
    TEXT_FIELDS,
};
pub use retry::{AttemptOutcome, RetryDecision, RetryPolicy, Retryability};
