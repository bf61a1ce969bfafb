//! Store configuration.
//!
//! Loaded from environment variables with development defaults, or built
//! up programmatically with the `with_*` methods.

use std::path::PathBuf;
use std::time::Duration;

use plato_core::COMMIT_CACHE_TTL;

const DEFAULT_LMDB_PATH: &str = "./data/plato";
const DEFAULT_LMDB_MAP_SIZE_MB: usize = 256;
const DEFAULT_LMDB_CACHE_MAP_SIZE_MB: usize = 64;
const LMDB_CACHE_DIR: &str = "cache";

/// Upper bound for a cache TTL read from the environment.
pub const MAX_COMMIT_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";

/// Configuration shared by the store adapters and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Sliding expiry applied to cached commit content.
    pub commit_cache_ttl: Duration,

    /// Directory holding the LMDB environment.
    pub lmdb_path: PathBuf,

    /// Maximum LMDB map size in megabytes.
    pub lmdb_map_size_mb: usize,

    /// Map size of the separate LMDB cache environment, in megabytes.
    pub lmdb_cache_map_size_mb: usize,

    /// Redis endpoint for the `redis-cache` feature.
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            commit_cache_ttl: COMMIT_CACHE_TTL,
            lmdb_path: PathBuf::from(DEFAULT_LMDB_PATH),
            lmdb_map_size_mb: DEFAULT_LMDB_MAP_SIZE_MB,
            lmdb_cache_map_size_mb: DEFAULT_LMDB_CACHE_MAP_SIZE_MB,
            redis_url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

impl StoreConfig {
    /// Create StoreConfig from environment variables.
    ///
    /// Environment variables:
    /// - `PLATO_COMMIT_CACHE_TTL_SECS`: Cached content expiry (default: 300,
    ///   capped at one year)
    /// - `PLATO_LMDB_PATH`: LMDB directory (default: ./data/plato)
    /// - `PLATO_LMDB_MAP_SIZE_MB`: LMDB map size (default: 256)
    /// - `PLATO_LMDB_CACHE_MAP_SIZE_MB`: LMDB cache map size (default: 64)
    /// - `PLATO_REDIS_URL`: Redis endpoint (default: redis://127.0.0.1/)
    ///
    /// Unparseable numbers fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let commit_cache_ttl = std::env::var("PLATO_COMMIT_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(|secs| Duration::from_secs(secs).min(MAX_COMMIT_CACHE_TTL))
            .unwrap_or(defaults.commit_cache_ttl);

        let lmdb_path = std::env::var("PLATO_LMDB_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.lmdb_path);

        let lmdb_map_size_mb = std::env::var("PLATO_LMDB_MAP_SIZE_MB")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .filter(|&mb: &usize| mb > 0)
            .unwrap_or(defaults.lmdb_map_size_mb);

        let lmdb_cache_map_size_mb = std::env::var("PLATO_LMDB_CACHE_MAP_SIZE_MB")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .filter(|&mb: &usize| mb > 0)
            .unwrap_or(defaults.lmdb_cache_map_size_mb);

        let redis_url = std::env::var("PLATO_REDIS_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.redis_url);

        Self {
            commit_cache_ttl,
            lmdb_path,
            lmdb_map_size_mb,
            lmdb_cache_map_size_mb,
            redis_url,
        }
    }

    /// Directory of the cache environment, nested under `lmdb_path`.
    pub fn lmdb_cache_path(&self) -> PathBuf {
        self.lmdb_path.join(LMDB_CACHE_DIR)
    }

    pub fn with_commit_cache_ttl(mut self, ttl: Duration) -> Self {
        self.commit_cache_ttl = ttl;
        self
    }

    pub fn with_lmdb_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lmdb_path = path.into();
        self
    }

    pub fn with_lmdb_map_size_mb(mut self, map_size_mb: usize) -> Self {
        self.lmdb_map_size_mb = map_size_mb;
        self
    }

    pub fn with_lmdb_cache_map_size_mb(mut self, map_size_mb: usize) -> Self {
        self.lmdb_cache_map_size_mb = map_size_mb;
        self
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.commit_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.lmdb_path, PathBuf::from("./data/plato"));
        assert_eq!(config.lmdb_map_size_mb, 256);
        assert_eq!(config.lmdb_cache_map_size_mb, 64);
        assert_eq!(config.lmdb_cache_path(), PathBuf::from("./data/plato/cache"));
        assert_eq!(config.redis_url, "redis://127.0.0.1/");
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::default()
            .with_commit_cache_ttl(Duration::from_secs(10))
            .with_lmdb_path("/tmp/plato")
            .with_lmdb_map_size_mb(32)
            .with_lmdb_cache_map_size_mb(4)
            .with_redis_url("redis://cache:6379/");

        assert_eq!(config.commit_cache_ttl, Duration::from_secs(10));
        assert_eq!(config.lmdb_path, PathBuf::from("/tmp/plato"));
        assert_eq!(config.lmdb_map_size_mb, 32);
        assert_eq!(config.lmdb_cache_map_size_mb, 4);
        assert_eq!(config.lmdb_cache_path(), PathBuf::from("/tmp/plato/cache"));
        assert_eq!(config.redis_url, "redis://cache:6379/");
    }

    // Every env var is exercised in this one test so parallel tests never
    // observe each other's values.
    #[test]
    fn test_from_env() {
        std::env::set_var("PLATO_COMMIT_CACHE_TTL_SECS", "60");
        std::env::set_var("PLATO_LMDB_PATH", "/var/lib/plato");
        std::env::set_var("PLATO_LMDB_MAP_SIZE_MB", "not-a-number");
        std::env::set_var("PLATO_LMDB_CACHE_MAP_SIZE_MB", "16");
        std::env::remove_var("PLATO_REDIS_URL");

        let config = StoreConfig::from_env();
        assert_eq!(config.commit_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.lmdb_path, PathBuf::from("/var/lib/plato"));
        assert_eq!(config.lmdb_map_size_mb, 256);
        assert_eq!(config.lmdb_cache_map_size_mb, 16);
        assert_eq!(config.redis_url, "redis://127.0.0.1/");

        std::env::set_var("PLATO_COMMIT_CACHE_TTL_SECS", u64::MAX.to_string());
        assert_eq!(StoreConfig::from_env().commit_cache_ttl, MAX_COMMIT_CACHE_TTL);

        std::env::remove_var("PLATO_COMMIT_CACHE_TTL_SECS");
        std::env::remove_var("PLATO_LMDB_PATH");
        std::env::remove_var("PLATO_LMDB_MAP_SIZE_MB");
        std::env::remove_var("PLATO_LMDB_CACHE_MAP_SIZE_MB");

        assert_eq!(StoreConfig::from_env(), StoreConfig::default());
    }
}
