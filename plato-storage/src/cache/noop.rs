//! Cache that stores nothing. Every read is a miss.

use std::time::Duration;

use async_trait::async_trait;
use plato_core::CacheError;

use super::Cache;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, _key: &str, _ttl: Duration) -> Result<Option<String>, CacheError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_misses() {
        let cache = NoopCache;
        let ttl = Duration::from_secs(1);
        cache.set("k", "v", ttl).await.unwrap();
        assert_eq!(cache.get("k", ttl).await.unwrap(), None);
    }
}
