//! Redis-backed cache.
//!
//! Uses `GETEX key PX <ttl>` so a hit refreshes the expiry in the same
//! server-side command that reads the value.

use std::time::Duration;

use async_trait::async_trait;
use plato_core::CacheError;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{debug, info};

use super::Cache;

/// Shared cache over a multiplexed, auto-reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisCache {
    connection_manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(|e| CacheError::Unavailable {
            reason: format!("invalid Redis URL: {e}"),
        })?;
        let connection_manager =
            ConnectionManager::new(client)
                .await
                .map_err(|e| CacheError::Unavailable {
                    reason: format!("failed to connect to Redis: {e}"),
                })?;

        info!(redis_url = %redis_url, "Redis cache connected");
        Ok(Self { connection_manager })
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection_manager.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::OperationFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        debug!(key = %key, bytes = value.len(), "Cached value");
        Ok(())
    }

    async fn get(&self, key: &str, ttl: Duration) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection_manager.clone();
        let value: Option<String> = redis::cmd("GETEX")
            .arg(key)
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::OperationFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        debug!(key = %key, hit = value.is_some(), "Cache lookup");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(RedisCache::ttl_millis(Duration::from_secs(300)), 300_000);
        assert_eq!(RedisCache::ttl_millis(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_unavailable() {
        let result = RedisCache::connect("not a url").await;
        assert!(matches!(result, Err(CacheError::Unavailable { .. })));
    }
}
