//! LMDB-backed blob store.
//!
//! Each version is one entry keyed `path ++ 0xFF ++ version (u64 BE)`. The
//! next version number is read from the last entry under the path inside the
//! same write transaction that stores the content, so concurrent puts to one
//! path never reuse a number.

use std::path::Path;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env};
use plato_core::{
    Checksum, EntityKind, PlatoError, PlatoResult, StorageError, StoreKind, VersionId,
};

use super::{version_ref, BlobStore, StoredBlob};
use crate::lmdb_env::{create_database, open_env, scoped_prefix, BLOB_DB};

const STORE: StoreKind = StoreKind::BlobStore;

#[derive(Clone)]
pub struct LmdbBlobStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbBlobStore {
    pub fn open<P: AsRef<Path>>(path: P, map_size_mb: usize) -> PlatoResult<Self> {
        let env = open_env(path, map_size_mb, STORE)?;
        Self::with_env(&env)
    }

    pub fn with_env(env: &Env) -> PlatoResult<Self> {
        let db = create_database(env, BLOB_DB).map_err(|e| StorageError::OpenFailed {
            store: STORE,
            reason: e.to_string(),
        })?;
        Ok(Self {
            env: env.clone(),
            db,
        })
    }

    fn encode_key(prefix: &[u8], version: u64) -> Vec<u8> {
        let mut key = Vec::with_capacity(prefix.len() + 8);
        key.extend_from_slice(prefix);
        key.extend_from_slice(&version.to_be_bytes());
        key
    }

    fn decode_version(prefix: &[u8], key: &[u8]) -> Option<u64> {
        let bytes: [u8; 8] = key.get(prefix.len()..)?.try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }
}

#[async_trait]
impl BlobStore for LmdbBlobStore {
    async fn put_content(&self, path: &str, content: &[u8]) -> PlatoResult<StoredBlob> {
        let write_failed = |reason: String| StorageError::WriteFailed {
            store: STORE,
            key: path.to_string(),
            reason,
        };
        let prefix = scoped_prefix(path);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| write_failed(e.to_string()))?;

        let latest = {
            let mut iter = self
                .db
                .rev_prefix_iter(&wtxn, &prefix)
                .map_err(|e| write_failed(e.to_string()))?;
            match iter.next() {
                Some(entry) => {
                    let (key, _) = entry.map_err(|e| write_failed(e.to_string()))?;
                    Self::decode_version(&prefix, key)
                        .ok_or_else(|| write_failed("malformed version key".to_string()))?
                }
                None => 0,
            }
        };
        let version = latest + 1;

        self.db
            .put(&mut wtxn, &Self::encode_key(&prefix, version), content)
            .map_err(|e| write_failed(e.to_string()))?;
        wtxn.commit().map_err(|e| write_failed(e.to_string()))?;

        Ok(StoredBlob {
            version_id: VersionId::new(version.to_string()),
            checksum: Checksum::of(content),
        })
    }

    async fn get_content(&self, path: &str, version_id: &VersionId) -> PlatoResult<Vec<u8>> {
        let not_found =
            || PlatoError::not_found(EntityKind::BlobVersion, version_ref(path, version_id));
        let Ok(version) = version_id.as_str().parse::<u64>() else {
            return Err(not_found());
        };

        let read_failed = |reason: String| StorageError::ReadFailed {
            store: STORE,
            key: version_ref(path, version_id),
            reason,
        };
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| read_failed(e.to_string()))?;

        let key = Self::encode_key(&scoped_prefix(path), version);
        match self.db.get(&rtxn, &key) {
            Ok(Some(bytes)) => Ok(bytes.to_vec()),
            Ok(None) => Err(not_found()),
            Err(e) => Err(read_failed(e.to_string()).into()),
        }
    }
}
