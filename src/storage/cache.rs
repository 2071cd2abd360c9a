//! File-backed TTL cache for upstream responses.
//!
//! Entries live at `{base_dir}/{category}/{sha256-hex}.{json|txt}`, one file
//! per entry. The file mtime is the write timestamp; an entry older than its
//! category TTL is deleted the first time it is read.
//!
//! # Features
//! - Atomic writes using temp file + rename (prevents torn entries)
//! - Per-category TTLs (metadata, text, search)
//! - Order- and case-insensitive key fingerprints
//! - Graceful degradation: read/write failures are logged and counted, never
//!   returned to callers
//!
//! Concurrent writers of the same key race; the last rename wins.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::LraError;
use crate::storage::config::Config;

/// Default TTL for opinion metadata.
pub const DEFAULT_TTL_METADATA: Duration = Duration::from_secs(24 * 60 * 60);
/// Default TTL for opinion full text.
pub const DEFAULT_TTL_TEXT: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Default TTL for search results.
pub const DEFAULT_TTL_SEARCH: Duration = Duration::from_secs(60 * 60);

/// Category of cached data. Each has its own TTL and directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    /// Opinion metadata records.
    Metadata,
    /// Opinion full text (stored raw).
    Text,
    /// Search and citation lookup results.
    Search,
}

impl CacheCategory {
    /// All categories, in directory order.
    pub const ALL: &'static [Self] = &[Self::Metadata, Self::Text, Self::Search];

    /// Directory name for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Text => "text",
            Self::Search => "search",
        }
    }

    /// File extension for entries of this category.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Metadata | Self::Search => "json",
        }
    }
}

impl std::fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheCategory {
    type Err = LraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metadata" => Ok(Self::Metadata),
            "text" => Ok(Self::Text),
            "search" => Ok(Self::Search),
            _ => Err(LraError::InvalidCacheCategory(s.to_string())),
        }
    }
}

/// TTL per cache category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryTtls {
    #[serde(with = "duration_secs")]
    pub metadata: Duration,
    #[serde(with = "duration_secs")]
    pub text: Duration,
    #[serde(with = "duration_secs")]
    pub search: Duration,
}

impl Default for CategoryTtls {
    fn default() -> Self {
        Self {
            metadata: DEFAULT_TTL_METADATA,
            text: DEFAULT_TTL_TEXT,
            search: DEFAULT_TTL_SEARCH,
        }
    }
}

impl CategoryTtls {
    /// TTL for a category.
    #[must_use]
    pub const fn for_category(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Metadata => self.metadata,
            CacheCategory::Text => self.text,
            CacheCategory::Search => self.search,
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}

// =============================================================================
// Cache keys
// =============================================================================

/// Lookup parameters identifying a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    /// A single string, hashed as-is.
    Scalar(String),
    /// Structured parameters, normalized before hashing.
    Params(Value),
}

impl CacheKey {
    /// Key from a single string.
    #[must_use]
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// Key from structured parameters.
    #[must_use]
    pub const fn params(value: Value) -> Self {
        Self::Params(value)
    }

    /// Stable SHA-256 fingerprint of the key.
    ///
    /// Structured parameters are normalized first: strings are trimmed and
    /// lowercased, null and empty-string members are dropped, object keys and
    /// array elements are sorted, and the result is serialized compactly.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let content = match self {
            Self::Scalar(value) => value.clone(),
            Self::Params(value) => {
                let mut out = String::new();
                write_canonical(&normalize(value), &mut out);
                out
            }
        };
        hex::encode(Sha256::digest(content.as_bytes()))
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self::scalar(value)
    }
}

impl From<Value> for CacheKey {
    fn from(value: Value) -> Self {
        Self::params(value)
    }
}

fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_lowercase()),
        Value::Array(items) => {
            let mut normalized: Vec<Value> = items.iter().map(normalize).collect();
            normalized.sort_by_cached_key(|item| {
                let mut key = String::new();
                write_canonical(item, &mut key);
                key
            });
            Value::Array(normalized)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !is_blank(v))
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Compact JSON with object keys in sorted order, independent of the
/// `serde_json` map implementation.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Counters for cache operations.
#[derive(Debug, Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    writes: AtomicU64,
}

impl CacheMetrics {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub writes: u64,
    pub file_count: u64,
    pub total_bytes: u64,
    pub base_dir: PathBuf,
    pub ttls: CategoryTtls,
}

// =============================================================================
// TtlCache
// =============================================================================

/// File-backed key/value store with per-category expiry.
#[derive(Debug)]
pub struct TtlCache {
    base_dir: PathBuf,
    ttls: CategoryTtls,
    enabled: bool,
    metrics: CacheMetrics,
}

impl TtlCache {
    /// Create a cache rooted at `base_dir`, creating category directories.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, ttls: CategoryTtls) -> Self {
        let cache = Self {
            base_dir: base_dir.into(),
            ttls,
            enabled: true,
            metrics: CacheMetrics::default(),
        };
        for category in CacheCategory::ALL {
            let dir = cache.category_dir(*category);
            if let Err(e) = std::fs::create_dir_all(&dir) {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to create cache dir");
            }
        }
        cache
    }

    /// The cache a config describes: rooted at its cache dir with its TTLs,
    /// disabled when `cache.enabled` is off.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        if config.cache.enabled {
            Self::new(config.cache_dir(), config.cache_ttls())
        } else {
            Self::disabled(config.cache_dir(), config.cache_ttls())
        }
    }

    /// A cache that never stores anything and always misses.
    #[must_use]
    pub fn disabled(base_dir: impl Into<PathBuf>, ttls: CategoryTtls) -> Self {
        Self {
            base_dir: base_dir.into(),
            ttls,
            enabled: false,
            metrics: CacheMetrics::default(),
        }
    }

    /// Whether caching is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Root directory of the cache.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Configured TTLs.
    #[must_use]
    pub const fn ttls(&self) -> &CategoryTtls {
        &self.ttls
    }

    /// Directory holding entries of one category.
    #[must_use]
    pub fn category_dir(&self, category: CacheCategory) -> PathBuf {
        self.base_dir.join(category.as_str())
    }

    /// Path of the entry for a key.
    #[must_use]
    pub fn entry_path(&self, category: CacheCategory, key: &CacheKey) -> PathBuf {
        self.category_dir(category)
            .join(format!("{}.{}", key.fingerprint(), category.extension()))
    }

    /// Read a structured entry. Misses on absence, expiry, or a payload that
    /// does not deserialize.
    pub fn get<T: DeserializeOwned>(&self, category: CacheCategory, key: &CacheKey) -> Option<T> {
        let (path, content) = self.read_fresh(category, key)?;
        match serde_json::from_str(&content) {
            Ok(value) => {
                self.metrics.hit();
                tracing::debug!(%category, path = %path.display(), "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to decode cache entry");
                self.metrics.error();
                self.metrics.miss();
                None
            }
        }
    }

    /// Read a raw text entry.
    pub fn get_text(&self, category: CacheCategory, key: &CacheKey) -> Option<String> {
        let (path, content) = self.read_fresh(category, key)?;
        self.metrics.hit();
        tracing::debug!(%category, path = %path.display(), "Cache hit");
        Some(content)
    }

    /// Store a structured entry, overwriting any existing one.
    pub fn set<T: Serialize>(&self, category: CacheCategory, key: &CacheKey, payload: &T) {
        if !self.enabled {
            return;
        }
        match serde_json::to_vec(payload) {
            Ok(bytes) => self.store(category, key, &bytes),
            Err(e) => {
                tracing::warn!(%category, error = %e, "Failed to encode cache entry");
                self.metrics.error();
            }
        }
    }

    /// Store a raw text entry, overwriting any existing one.
    pub fn set_text(&self, category: CacheCategory, key: &CacheKey, text: &str) {
        if self.enabled {
            self.store(category, key, text.as_bytes());
        }
    }

    /// Remove every entry of one category, or of all categories.
    ///
    /// Returns the number of files removed.
    pub fn clear(&self, category: Option<CacheCategory>) -> usize {
        if !self.enabled {
            return 0;
        }
        let targets = category.map_or_else(|| CacheCategory::ALL.to_vec(), |c| vec![c]);
        let mut removed = 0;
        for target in targets {
            for path in files_in(&self.category_dir(target)) {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                    }
                }
            }
        }
        tracing::info!(removed, target = ?category, "Cache cleared");
        removed
    }

    /// Counters plus on-disk size.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut file_count = 0;
        let mut total_bytes = 0;
        if self.enabled {
            for category in CacheCategory::ALL {
                for path in files_in(&self.category_dir(*category)) {
                    if let Ok(metadata) = path.metadata() {
                        file_count += 1;
                        total_bytes += metadata.len();
                    }
                }
            }
        }
        CacheStats {
            enabled: self.enabled,
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            errors: self.metrics.errors.load(Ordering::Relaxed),
            writes: self.metrics.writes.load(Ordering::Relaxed),
            file_count,
            total_bytes,
            base_dir: self.base_dir.clone(),
            ttls: self.ttls,
        }
    }

    fn read_fresh(&self, category: CacheCategory, key: &CacheKey) -> Option<(PathBuf, String)> {
        if !self.enabled {
            return None;
        }
        let path = self.entry_path(category, key);
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat cache entry");
                    self.metrics.error();
                }
                self.metrics.miss();
                return None;
            }
        };

        let ttl = self.ttls.for_category(category);
        if entry_age(&metadata) > ttl {
            self.metrics.miss();
            tracing::debug!(%category, path = %path.display(), "Cache entry expired");
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), error = %e, "Failed to remove expired entry");
            }
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Some((path, content)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                self.metrics.error();
                self.metrics.miss();
                None
            }
        }
    }

    fn store(&self, category: CacheCategory, key: &CacheKey, bytes: &[u8]) {
        let path = self.entry_path(category, key);
        let result = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| write_atomic(&path, bytes));
        match result {
            Ok(()) => {
                self.metrics.write();
                tracing::debug!(%category, path = %path.display(), bytes = bytes.len(), "Cache write");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write cache entry");
                self.metrics.error();
            }
        }
    }
}

fn entry_age(metadata: &std::fs::Metadata) -> Duration {
    metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .unwrap_or(Duration::ZERO)
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .ok()
        .into_iter()
        .flatten()
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect()
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write bytes atomically using temp file + rename.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Temp file must live in the same directory for the rename to be atomic.
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("entry"),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    std::fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&temp_path);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::test_utils::set_entry_age;

    fn cache_in(tmp: &TempDir) -> TtlCache {
        TtlCache::new(tmp.path().join("cache"), CategoryTtls::default())
    }

    #[test]
    fn fingerprint_ignores_key_order() {
        let a = CacheKey::params(json!({"q": "roe", "court": "scotus", "hit": 20}));
        let b = CacheKey::params(json!({"hit": 20, "court": "scotus", "q": "roe"}));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_ignores_case_and_whitespace() {
        let a = CacheKey::params(json!({"q": "  Roe v. Wade ", "court": "SCOTUS"}));
        let b = CacheKey::params(json!({"q": "roe v. wade", "court": "scotus"}));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_sorts_nested_collections() {
        let a = CacheKey::params(json!({"courts": ["ca9", "SCOTUS", "ca2"], "f": {"b": 1, "a": [3, 1]}}));
        let b = CacheKey::params(json!({"f": {"a": [1, 3], "b": 1}, "courts": ["scotus", "ca2", "ca9"]}));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_drops_blank_members() {
        let a = CacheKey::params(json!({"q": "roe", "judge": null, "court": ""}));
        let b = CacheKey::params(json!({"q": "roe"}));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_values() {
        let a = CacheKey::params(json!({"opinion_id": 1}));
        let b = CacheKey::params(json!({"opinion_id": 2}));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn scalar_key_is_plain_sha256() {
        let key = CacheKey::scalar("abc");
        assert_eq!(
            key.fingerprint(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn layout_mirrors_categories() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let key = CacheKey::scalar("k");

        let text_path = cache.entry_path(CacheCategory::Text, &key);
        assert!(text_path.starts_with(tmp.path().join("cache/text")));
        assert_eq!(text_path.extension().unwrap(), "txt");

        let meta_path = cache.entry_path(CacheCategory::Metadata, &key);
        assert!(meta_path.starts_with(tmp.path().join("cache/metadata")));
        assert_eq!(meta_path.extension().unwrap(), "json");
    }

    #[test]
    fn set_then_get_structured() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let key = CacheKey::params(json!({"opinion_id": 7}));

        cache.set(CacheCategory::Metadata, &key, &json!({"id": 7, "plain_text": "x"}));
        let value: Value = cache.get(CacheCategory::Metadata, &key).unwrap();

        assert_eq!(value["id"], 7);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.file_count, 1);
    }

    #[test]
    fn text_is_stored_raw() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let key = CacheKey::params(json!({"opinion_id": 7, "field": "full_text"}));

        cache.set_text(CacheCategory::Text, &key, "It is so ordered.");

        let raw = std::fs::read_to_string(cache.entry_path(CacheCategory::Text, &key)).unwrap();
        assert_eq!(raw, "It is so ordered.");
        assert_eq!(
            cache.get_text(CacheCategory::Text, &key).as_deref(),
            Some("It is so ordered.")
        );
    }

    #[test]
    fn entry_is_hit_just_before_ttl() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let key = CacheKey::scalar("fresh");
        cache.set(CacheCategory::Search, &key, &json!([1]));

        let path = cache.entry_path(CacheCategory::Search, &key);
        set_entry_age(&path, DEFAULT_TTL_SEARCH - Duration::from_secs(5));

        assert!(cache.get::<Value>(CacheCategory::Search, &key).is_some());
        assert!(path.exists());
    }

    #[test]
    fn entry_expires_after_ttl_and_is_deleted() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let key = CacheKey::scalar("stale");
        cache.set(CacheCategory::Search, &key, &json!([1]));

        let path = cache.entry_path(CacheCategory::Search, &key);
        set_entry_age(&path, DEFAULT_TTL_SEARCH + Duration::from_secs(5));

        assert!(cache.get::<Value>(CacheCategory::Search, &key).is_none());
        assert!(!path.exists());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn ttls_are_independent_per_category() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let key = CacheKey::scalar("same");
        cache.set(CacheCategory::Metadata, &key, &json!(1));
        cache.set(CacheCategory::Search, &key, &json!(2));

        let age = Duration::from_secs(2 * 60 * 60);
        set_entry_age(&cache.entry_path(CacheCategory::Metadata, &key), age);
        set_entry_age(&cache.entry_path(CacheCategory::Search, &key), age);

        assert_eq!(cache.get::<i32>(CacheCategory::Metadata, &key), Some(1));
        assert_eq!(cache.get::<i32>(CacheCategory::Search, &key), None);
    }

    #[test]
    fn corrupt_entry_is_counted_miss() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let key = CacheKey::scalar("corrupt");
        std::fs::write(cache.entry_path(CacheCategory::Metadata, &key), "{not json").unwrap();

        assert!(cache.get::<Value>(CacheCategory::Metadata, &key).is_none());
        let stats = cache.stats();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn write_failure_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let cache = TtlCache::new(&blocker, CategoryTtls::default());

        cache.set(CacheCategory::Metadata, &CacheKey::scalar("k"), &json!(1));

        assert_eq!(cache.stats().errors, 1);
        assert!(cache.get::<Value>(CacheCategory::Metadata, &CacheKey::scalar("k")).is_none());
    }

    #[test]
    fn overwrite_replaces_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        let key = CacheKey::scalar("k");
        cache.set(CacheCategory::Search, &key, &json!("first"));
        cache.set(CacheCategory::Search, &key, &json!("second"));

        assert_eq!(
            cache.get::<String>(CacheCategory::Search, &key).as_deref(),
            Some("second")
        );
        assert_eq!(cache.stats().file_count, 1);
    }

    #[test]
    fn clear_single_category() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        cache.set(CacheCategory::Metadata, &CacheKey::scalar("a"), &json!(1));
        cache.set(CacheCategory::Metadata, &CacheKey::scalar("b"), &json!(2));
        cache.set_text(CacheCategory::Text, &CacheKey::scalar("c"), "text");

        assert_eq!(cache.clear(Some(CacheCategory::Metadata)), 2);
        assert_eq!(cache.stats().file_count, 1);
        assert_eq!(cache.clear(None), 1);
        assert_eq!(cache.stats().file_count, 0);
    }

    #[test]
    fn from_config_follows_enabled_flag() {
        let tmp = TempDir::new().unwrap();
        let on = tmp.path().join("on");
        let mut config = crate::test_utils::make_test_config("http://127.0.0.1:1/", &on);
        let cache = TtlCache::from_config(&config);
        assert!(cache.is_enabled());
        assert_eq!(cache.base_dir(), on);
        assert!(cache.category_dir(CacheCategory::Search).is_dir());

        config.cache.enabled = false;
        config.cache.dir = Some(tmp.path().join("off"));
        let cache = TtlCache::from_config(&config);
        assert!(!cache.is_enabled());
        assert!(!tmp.path().join("off").exists());
    }

    #[test]
    fn disabled_cache_is_inert() {
        let tmp = TempDir::new().unwrap();
        let cache = TtlCache::disabled(tmp.path().join("off"), CategoryTtls::default());
        let key = CacheKey::scalar("k");

        cache.set(CacheCategory::Metadata, &key, &json!(1));

        assert!(cache.get::<Value>(CacheCategory::Metadata, &key).is_none());
        assert_eq!(cache.clear(None), 0);
        let stats = cache.stats();
        assert!(!stats.enabled);
        assert_eq!(stats.misses, 0);
        assert!(!tmp.path().join("off").exists());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(&tmp);
        cache.set(CacheCategory::Search, &CacheKey::scalar("k"), &json!({"a": 1}));

        let entries: Vec<_> = std::fs::read_dir(cache.category_dir(CacheCategory::Search))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn category_parsing() {
        assert_eq!("Metadata".parse::<CacheCategory>().unwrap(), CacheCategory::Metadata);
        assert_eq!(" text ".parse::<CacheCategory>().unwrap(), CacheCategory::Text);
        assert!(matches!(
            "blobs".parse::<CacheCategory>(),
            Err(LraError::InvalidCacheCategory(_))
        ));
    }
}
