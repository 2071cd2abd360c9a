//! Test fixtures for integration tests.
//!
//! Canned CourtListener records plus helpers that mount them on a
//! `wiremock` server and build a client pointed at it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::fixtures::*;
//!
//! let env = MockEnv::start().await;
//! mount_search(&env.server, "\"410 U.S. 113\"", roe_search_response()).await;
//! let client = env.client();
//! ```

#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub use lra::core::client::ResilientClient;
pub use lra::storage::config::Config;
pub use lra::test_utils::{make_search_response, make_test_case, make_test_config, make_test_opinion};

// =============================================================================
// Canned records
// =============================================================================

pub const ROE_CITATION: &str = "410 U.S. 113";

/// Search hits for `"410 U.S. 113"`, oldest first.
///
/// The first hit only mentions Roe in its text; the second is Roe itself.
#[must_use]
pub fn roe_search_response() -> Value {
    make_search_response(vec![
        make_test_case(
            1001,
            "Doe v. Bolton",
            &["410 U.S. 179"],
            "1973-01-22",
        ),
        make_test_case(108_713, "Roe v. Wade", &[ROE_CITATION], "1973-01-22"),
        make_test_case(
            2002,
            "Planned Parenthood v. Casey",
            &["505 U.S. 833"],
            "1992-06-29",
        ),
    ])
}

/// Later cases citing Roe, newest first.
#[must_use]
pub fn citing_cases_response() -> Value {
    make_search_response(vec![
        make_test_case(3003, "Dobbs v. Jackson", &["597 U.S. 215"], "2022-06-24"),
        make_test_case(2002, "Planned Parenthood v. Casey", &["505 U.S. 833"], "1992-06-29"),
        make_test_case(2002, "Planned Parenthood v. Casey", &["505 U.S. 833"], "1992-06-29"),
        make_test_case(1500, "Webster v. Reproductive Health", &["492 U.S. 490"], "1989-07-03"),
    ])
}

// =============================================================================
// Mock server environment
// =============================================================================

/// A mock CourtListener server plus a scratch cache directory.
pub struct MockEnv {
    pub server: MockServer,
    pub dir: TempDir,
}

impl MockEnv {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    /// Fast-retry configuration pointed at the mock server.
    #[must_use]
    pub fn config(&self) -> Config {
        make_test_config(&self.server.uri(), &self.cache_dir())
    }

    #[must_use]
    pub fn client(&self) -> ResilientClient {
        ResilientClient::new(&self.config()).expect("build client")
    }

    #[must_use]
    pub fn client_with(&self, adjust: impl FnOnce(&mut Config)) -> ResilientClient {
        let mut config = self.config();
        adjust(&mut config);
        ResilientClient::new(&config).expect("build client")
    }

    /// Number of requests the server has seen so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

/// Answer searches for exactly `q` with `body`.
pub async fn mount_search(server: &MockServer, q: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer searches for exactly `q` with a bare status code.
pub async fn mount_search_status(server: &MockServer, q: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve `body` for `/opinions/{id}/`.
pub async fn mount_opinion(server: &MockServer, id: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/opinions/{id}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
