//! Test utilities for lra.
//!
//! Provides shared helpers, test data factories, and assertion macros
//! for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lra::test_utils::*;
//!
//! let dir = TestDir::new();
//! let config = make_test_config(&server.uri(), &dir.path().join("cache"));
//! let opinion = make_test_opinion(42, "It is so ordered.");
//! ```

use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde_json::{Value, json};

use crate::storage::config::Config;

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create an opinion record with `plain_text` populated.
#[must_use]
pub fn make_test_opinion(id: u64, plain_text: &str) -> Value {
    json!({
        "id": id,
        "absolute_url": format!("/opinion/{id}/test-v-case/"),
        "type": "010combined",
        "plain_text": plain_text,
        "html_lawbox": "",
        "html": "",
        "html_columbia": "",
        "html_anon_2020": "",
    })
}

/// Create a search hit for a case with the given own citations.
#[must_use]
pub fn make_test_case(id: u64, case_name: &str, citations: &[&str], date_filed: &str) -> Value {
    json!({
        "id": id,
        "cluster_id": id,
        "caseName": case_name,
        "absolute_url": format!("/opinion/{id}/{}/", case_name.to_lowercase().replace(' ', "-")),
        "citation": citations,
        "court": "Supreme Court of the United States",
        "court_id": "scotus",
        "dateFiled": date_filed,
    })
}

/// Wrap records in a search response envelope.
#[must_use]
pub fn make_search_response(results: Vec<Value>) -> Value {
    json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results,
    })
}

/// Configuration pointing at a mock server with fast retries.
///
/// Three attempts with 10ms base backoff, breaker threshold 5 with a 200ms
/// cooldown, and the cache rooted at `cache_dir`.
#[must_use]
pub fn make_test_config(base_url: &str, cache_dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.api_key = Some("test-token".to_string());
    config.api.timeout_seconds = 5.0;
    config.api.connect_timeout_seconds = 2.0;
    config.api.read_timeout_seconds = 5.0;
    config.api.retry_attempts = 3;
    config.api.retry_backoff_seconds = 0.01;
    config.api.retry_backoff_cap_seconds = 0.05;
    config.circuit_breaker.failure_threshold = 5;
    config.circuit_breaker.cooldown_seconds = 0.2;
    config.cache.dir = Some(cache_dir.to_path_buf());
    config
}

/// Backdate a cache entry so it looks `age` old.
///
/// # Panics
///
/// Panics if the file cannot be opened or its mtime cannot be set.
pub fn set_entry_age(path: &Path, age: Duration) {
    let file = fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open cache entry");
    file.set_modified(SystemTime::now() - age)
        .expect("Failed to set mtime");
}

// =============================================================================
// Temporary Directory
// =============================================================================

/// An isolated temporary directory, removed on drop.
///
/// # Examples
///
/// ```rust,ignore
/// use lra::test_utils::TestDir;
///
/// let dir = TestDir::new();
/// dir.create_file("config.toml", "[api]\nretry_attempts = 1");
/// assert!(dir.file_exists("config.toml"));
/// ```
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file with the given content, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    /// Check if a file exists in the temporary directory.
    #[must_use]
    pub fn file_exists(&self, name: &str) -> bool {
        self.inner.path().join(name).exists()
    }

    /// Get the full path to a file in the temporary directory.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }

    /// Count regular files below `name`, recursively.
    #[must_use]
    pub fn count_files(&self, name: &str) -> usize {
        fn walk(dir: &Path) -> usize {
            fs::read_dir(dir).map_or(0, |entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|entry| {
                        let path = entry.path();
                        if path.is_dir() { walk(&path) } else { 1 }
                    })
                    .sum()
            })
        }
        walk(&self.inner.path().join(name))
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
///
/// # Examples
///
/// ```rust,ignore
/// use lra::assert_contains;
///
/// assert_contains!("410 U.S. 113", "U.S.");
/// ```
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert approximate floating point equality.
///
/// # Examples
///
/// ```rust,ignore
/// use lra::assert_float_eq;
///
/// assert_float_eq!(result.confidence, 0.5);
/// ```
#[macro_export]
macro_rules! assert_float_eq {
    ($left:expr, $right:expr) => {
        let left: f64 = $left;
        let right: f64 = $right;
        let epsilon: f64 = f64::EPSILON * 100.0;
        assert!(
            (left - right).abs() < epsilon,
            "Float equality assertion failed: {} != {} (epsilon: {})",
            left,
            right,
            epsilon
        );
    };
}
