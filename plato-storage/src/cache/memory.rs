//! In-process cache with sliding expiration.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use plato_core::CacheError;

use super::{Cache, CacheStats, StatsCounter};

/// Expired entries are pruned on every `PRUNE_INTERVAL`th write.
const PRUNE_INTERVAL: u64 = 64;

/// Longest lifetime an entry can get; longer TTLs are clamped to it.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Cache held in a single mutex-guarded map.
///
/// Expired entries are dropped when next read and swept out periodically on
/// write. The lock is held across the expiry check and the refresh, which
/// makes `get` atomic.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    stats: StatsCounter,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Number of stored entries, expired ones included until pruned.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn expiry_after(now: Instant, ttl: Duration) -> Instant {
        now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        let now = Instant::now();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Self::expiry_after(now, ttl),
            },
        );
        if self.stats.record_write() % PRUNE_INTERVAL == 0 {
            entries.retain(|_, entry| entry.expires_at > now);
        }
        Ok(())
    }

    async fn get(&self, key: &str, ttl: Duration) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        let now = Instant::now();

        let live = match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = Self::expiry_after(now, ttl);
                Some(entry.value.clone())
            }
            _ => None,
        };

        match live {
            Some(value) => {
                self.stats.record_hit();
                Ok(Some(value))
            }
            None => {
                // Expired or absent; removal is a no-op for the latter.
                entries.remove(key);
                self.stats.record_miss();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryCache::new();
        cache.set("commit:p:main:c1", "Hello", TTL).await.unwrap();
        assert_eq!(
            cache.get("commit:p:main:c1", TTL).await.unwrap(),
            Some("Hello".to_string())
        );
        assert_eq!(cache.get("commit:p:main:c2", TTL).await.unwrap(), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Duration::from_millis(40))
            .await
            .unwrap();
        std::thread::sleep(Duration::from_millis(120));

        assert_eq!(cache.get("k", TTL).await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_hit_extends_expiry() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_millis(300);
        cache.set("k", "v", ttl).await.unwrap();

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(cache.get("k", ttl).await.unwrap(), Some("v".to_string()));

        // 400ms after the set, but only 200ms after the refreshing read.
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(cache.get("k", ttl).await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = InMemoryCache::new();
        cache.set("k", "old", TTL).await.unwrap();
        cache.set("k", "new", TTL).await.unwrap();
        assert_eq!(cache.get("k", TTL).await.unwrap(), Some("new".to_string()));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let cache = InMemoryCache::new();
        let forever = Duration::from_secs(u64::MAX);
        cache.set("k", "v", forever).await.unwrap();
        assert_eq!(cache.get("k", forever).await.unwrap(), Some("v".to_string()));
        assert_eq!(cache.get("k", Duration::MAX).await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_writes_prune_expired_entries() {
        let cache = InMemoryCache::new();
        for i in 0..PRUNE_INTERVAL {
            cache
                .set(&format!("stale:{i}"), "v", Duration::from_millis(1))
                .await
                .unwrap();
        }
        std::thread::sleep(Duration::from_millis(20));

        for i in 0..PRUNE_INTERVAL {
            cache.set(&format!("live:{i}"), "v", TTL).await.unwrap();
        }
        // None of the stale keys was read again.
        assert_eq!(cache.len(), PRUNE_INTERVAL as usize);
    }
}
