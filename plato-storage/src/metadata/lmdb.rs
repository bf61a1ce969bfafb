//! LMDB-backed metadata store.
//!
//! Keys are encoded as `partition ++ 0xFF ++ sort`, so a partition scan is a
//! prefix iteration and LMDB's byte ordering gives sort key order for free.
//! Conditional puts read and write inside one write transaction; LMDB
//! serializes writers, which makes the check-and-set atomic.

use std::path::Path;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env};
use plato_core::{CompositeKey, PlatoResult, StorageError, StoreKind};

use super::{MetadataItem, MetadataStore, PutCondition, ScanOrder};
use crate::lmdb_env::{create_database, open_env, scoped_prefix, METADATA_DB};

const STORE: StoreKind = StoreKind::MetadataStore;

/// Metadata index persisted in an LMDB named database.
#[derive(Clone)]
pub struct LmdbMetadataStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbMetadataStore {
    /// Open a dedicated environment at `path`.
    pub fn open<P: AsRef<Path>>(path: P, map_size_mb: usize) -> PlatoResult<Self> {
        let env = open_env(path, map_size_mb, STORE)?;
        Self::with_env(&env)
    }

    /// Use the `metadata` database of an already-open environment.
    pub fn with_env(env: &Env) -> PlatoResult<Self> {
        let db = create_database(env, METADATA_DB).map_err(|e| StorageError::OpenFailed {
            store: STORE,
            reason: e.to_string(),
        })?;
        Ok(Self {
            env: env.clone(),
            db,
        })
    }

    fn encode_key(key: &CompositeKey) -> Vec<u8> {
        let mut bytes = scoped_prefix(&key.partition);
        bytes.extend_from_slice(key.sort.as_bytes());
        bytes
    }
}

#[async_trait]
impl MetadataStore for LmdbMetadataStore {
    async fn put(&self, item: MetadataItem, condition: PutCondition) -> PlatoResult<()> {
        let write_failed = |reason: String| StorageError::WriteFailed {
            store: STORE,
            key: item.key.to_string(),
            reason,
        };
        let encoded_key = Self::encode_key(&item.key);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| write_failed(e.to_string()))?;

        let exists = self
            .db
            .get(&wtxn, &encoded_key)
            .map_err(|e| write_failed(e.to_string()))?
            .is_some();
        if !condition.allows(exists) {
            // Dropping the transaction aborts it.
            return Err(StorageError::ConditionFailed {
                key: item.key.to_string(),
                condition: condition.to_string(),
            }
            .into());
        }

        self.db
            .put(&mut wtxn, &encoded_key, &item.body)
            .map_err(|e| write_failed(e.to_string()))?;
        wtxn.commit().map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &CompositeKey) -> PlatoResult<Option<MetadataItem>> {
        let read_failed = |reason: String| StorageError::ReadFailed {
            store: STORE,
            key: key.to_string(),
            reason,
        };

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| read_failed(e.to_string()))?;
        let body = self
            .db
            .get(&rtxn, &Self::encode_key(key))
            .map_err(|e| read_failed(e.to_string()))?;

        Ok(body.map(|bytes| MetadataItem::new(key.clone(), bytes.to_vec())))
    }

    async fn query(&self, partition: &str, order: ScanOrder) -> PlatoResult<Vec<MetadataItem>> {
        let query_failed = |reason: String| StorageError::QueryFailed {
            store: STORE,
            partition: partition.to_string(),
            reason,
        };
        let prefix = scoped_prefix(partition);

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| query_failed(e.to_string()))?;

        let mut items = Vec::new();
        let mut collect = |entry: Result<(&[u8], &[u8]), heed::Error>| -> PlatoResult<()> {
            let (key, body) = entry.map_err(|e| query_failed(e.to_string()))?;
            let sort = std::str::from_utf8(&key[prefix.len()..])
                .map_err(|e| query_failed(format!("non UTF-8 sort key: {e}")))?;
            items.push(MetadataItem::new(
                CompositeKey::new(partition, sort),
                body.to_vec(),
            ));
            Ok(())
        };

        match order {
            ScanOrder::Ascending => {
                let iter = self
                    .db
                    .prefix_iter(&rtxn, &prefix)
                    .map_err(|e| query_failed(e.to_string()))?;
                for entry in iter {
                    collect(entry)?;
                }
            }
            ScanOrder::Descending => {
                let iter = self
                    .db
                    .rev_prefix_iter(&rtxn, &prefix)
                    .map_err(|e| query_failed(e.to_string()))?;
                for entry in iter {
                    collect(entry)?;
                }
            }
        }

        Ok(items)
    }
}
