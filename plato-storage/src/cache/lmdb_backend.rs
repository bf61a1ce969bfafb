//! LMDB-backed cache.
//!
//! Entries are stored as `[expires_at millis: 8 bytes LE][utf8 value]`. A
//! read that hits rewrites the expiry inside the same write transaction, so
//! the refresh is atomic with the read.
//!
//! The map size bounds the cache. When a write finds the map full, every
//! expired entry is swept and the write is retried once; if live entries
//! alone fill the map the write fails with a [`CacheError`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, MdbError};
use plato_core::CacheError;
use tracing::debug;

use super::{Cache, CacheStats, StatsCounter};
use crate::lmdb_env::{create_database, open_cache_env, CACHE_DB};

const EXPIRY_LEN: usize = 8;

pub struct LmdbCache {
    env: Env,
    db: Database<Bytes, Bytes>,
    stats: StatsCounter,
}

impl LmdbCache {
    /// Open a dedicated cache environment at `path`.
    pub fn open<P: AsRef<Path>>(path: P, map_size_mb: usize) -> Result<Self, CacheError> {
        let env = open_cache_env(path, map_size_mb)?;
        Self::with_env(&env)
    }

    pub fn with_env(env: &Env) -> Result<Self, CacheError> {
        let db = create_database(env, CACHE_DB).map_err(|e| CacheError::Unavailable {
            reason: format!("failed to open cache database: {e}"),
        })?;
        Ok(Self {
            env: env.clone(),
            db,
            stats: StatsCounter::default(),
        })
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Delete every expired (or unreadable) entry. Returns how many went.
    pub fn sweep_expired(&self) -> Result<usize, CacheError> {
        self.sweep().map_err(|e| CacheError::OperationFailed {
            key: "*".to_string(),
            reason: e.to_string(),
        })
    }

    fn sweep(&self) -> Result<usize, heed::Error> {
        let now = Utc::now().timestamp_millis();
        let mut wtxn = self.env.write_txn()?;

        let expired = self
            .db
            .iter(&wtxn)?
            .filter_map(|entry| match entry {
                Ok((key, bytes)) if Self::expires_at(bytes).map_or(true, |at| at <= now) => {
                    Some(Ok(key.to_vec()))
                }
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        for key in &expired {
            self.db.delete(&mut wtxn, key)?;
        }
        wtxn.commit()?;
        Ok(expired.len())
    }

    fn put_entry(&self, key: &str, entry: &[u8]) -> Result<(), heed::Error> {
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, key.as_bytes(), entry)?;
        wtxn.commit()
    }

    fn expiry_after(ttl: Duration) -> i64 {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Utc::now().timestamp_millis().saturating_add(ttl_millis)
    }

    fn expires_at(entry: &[u8]) -> Option<i64> {
        let expiry: [u8; EXPIRY_LEN] = entry.get(..EXPIRY_LEN)?.try_into().ok()?;
        Some(i64::from_le_bytes(expiry))
    }

    fn encode_entry(value: &[u8], expires_at: i64) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(EXPIRY_LEN + value.len());
        bytes.extend_from_slice(&expires_at.to_le_bytes());
        bytes.extend_from_slice(value);
        bytes
    }
}

#[async_trait]
impl Cache for LmdbCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let failed = |reason: String| CacheError::OperationFailed {
            key: key.to_string(),
            reason,
        };
        let entry = Self::encode_entry(value.as_bytes(), Self::expiry_after(ttl));

        match self.put_entry(key, &entry) {
            Ok(()) => {}
            Err(heed::Error::Mdb(MdbError::MapFull)) => {
                let swept = self.sweep().map_err(|e| failed(e.to_string()))?;
                debug!(swept, "Cache map full, expired entries swept");
                self.put_entry(key, &entry)
                    .map_err(|e| failed(e.to_string()))?;
            }
            Err(e) => return Err(failed(e.to_string())),
        }

        self.stats.record_write();
        Ok(())
    }

    async fn get(&self, key: &str, ttl: Duration) -> Result<Option<String>, CacheError> {
        let failed = |reason: String| CacheError::OperationFailed {
            key: key.to_string(),
            reason,
        };
        let corrupt = |reason: &str| CacheError::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let mut wtxn = self.env.write_txn().map_err(|e| failed(e.to_string()))?;

        let value = match self
            .db
            .get(&wtxn, key.as_bytes())
            .map_err(|e| failed(e.to_string()))?
        {
            None => None,
            Some(bytes) if bytes.len() < EXPIRY_LEN => return Err(corrupt("truncated entry")),
            Some(bytes) => {
                let (expiry_bytes, value_bytes) = bytes.split_at(EXPIRY_LEN);
                let expiry: [u8; EXPIRY_LEN] = expiry_bytes
                    .try_into()
                    .map_err(|_| corrupt("invalid expiry"))?;
                let expires_at = i64::from_le_bytes(expiry);
                if expires_at <= Utc::now().timestamp_millis() {
                    None
                } else {
                    let value = std::str::from_utf8(value_bytes)
                        .map_err(|_| corrupt("value is not UTF-8"))?;
                    Some(value.to_string())
                }
            }
        };

        match value {
            Some(value) => {
                let entry = Self::encode_entry(value.as_bytes(), Self::expiry_after(ttl));
                self.db
                    .put(&mut wtxn, key.as_bytes(), &entry)
                    .map_err(|e| failed(e.to_string()))?;
                wtxn.commit().map_err(|e| failed(e.to_string()))?;
                self.stats.record_hit();
                Ok(Some(value))
            }
            None => {
                // Expired entries are dropped eagerly; absent keys make this a no-op.
                self.db
                    .delete(&mut wtxn, key.as_bytes())
                    .map_err(|e| failed(e.to_string()))?;
                wtxn.commit().map_err(|e| failed(e.to_string()))?;
                self.stats.record_miss();
                Ok(None)
            }
        }
    }
}
