//! Common test utilities and fixtures for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: Mock CourtListener server setup and canned records
//! - `logger`: Structured test logging infrastructure

pub mod fixtures;
pub mod logger;
