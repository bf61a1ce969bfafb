//! Commit content cache.
//!
//! A key-value cache with sliding expiration: a hit extends the entry's
//! lifetime atomically with the read. The cache is an optimization only;
//! callers treat every [`CacheError`](plato_core::CacheError) as a miss.

mod lmdb_backend;
mod memory;
mod noop;
#[cfg(feature = "redis-cache")]
mod redis_backend;

pub use lmdb_backend::LmdbCache;
pub use memory::InMemoryCache;
pub use noop::NoopCache;
#[cfg(feature = "redis-cache")]
pub use redis_backend::RedisCache;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use plato_core::CacheError;

/// Cache backend trait for pluggable cache implementations.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Read `key` and, on a hit, reset its expiry to `ttl` from now.
    ///
    /// Read and refresh are a single atomic step: a concurrent expiry can not
    /// fall between them.
    async fn get(&self, key: &str, ttl: Duration) -> Result<Option<String>, CacheError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of successful sets.
    pub writes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free hit/miss counters shared by the local backends.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a write and return the running total.
    pub(crate) fn record_write(&self) -> u64 {
        self.writes.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}
