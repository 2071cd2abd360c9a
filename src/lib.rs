//! lra - Legal Research Assistant
//!
//! A resilient, cached client for the CourtListener REST API: a TTL file
//! cache, a retry policy and a circuit breaker wrapped around the five
//! operations research tools build on (citation lookup, citing cases,
//! opinion metadata, opinion text, and opinion search).

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod storage;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ExitCode, LraError, Result, TimeoutPhase};

// Re-export test utilities for external test crates
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::*;
