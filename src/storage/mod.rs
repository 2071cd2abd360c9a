//! Storage for configuration and cached upstream responses.

pub mod cache;
pub mod config;
pub mod paths;

pub use cache::{CacheCategory, CacheKey, CacheStats, CategoryTtls, TtlCache};
pub use config::{
    Config, ENV_API_KEY, ENV_API_KEY_ALT, ENV_BASE_URL, ENV_CACHE_DIR, ENV_CACHE_ENABLED,
    ENV_CONFIG, ENV_RETRY_ATTEMPTS, ENV_TIMEOUT,
};
pub use paths::AppPaths;
