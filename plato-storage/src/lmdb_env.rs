//! LMDB environments.
//!
//! The metadata index and blob store share one environment, each in its own
//! named database. LMDB refuses to open the same directory twice in one
//! process, so both stores borrow a single [`Env`]. The cache gets a separate
//! environment with its own map size: a full cache map must never stop a
//! durable write.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use plato_core::{CacheError, StorageError, StoreKind};

pub const METADATA_DB: &str = "metadata";
pub const BLOB_DB: &str = "blobs";
pub const CACHE_DB: &str = "cache";

/// Separates key components in encoded LMDB keys. Never valid in UTF-8, so
/// it cannot occur inside an identifier.
pub const KEY_SEPARATOR: u8 = 0xFF;

/// Open (creating if needed) the environment rooted at `path` on behalf of
/// `store`.
pub fn open_env<P: AsRef<Path>>(
    path: P,
    map_size_mb: usize,
    store: StoreKind,
) -> Result<Env, StorageError> {
    open_at(path.as_ref(), map_size_mb).map_err(|reason| StorageError::OpenFailed { store, reason })
}

/// Open (creating if needed) a cache environment rooted at `path`.
pub(crate) fn open_cache_env<P: AsRef<Path>>(
    path: P,
    map_size_mb: usize,
) -> Result<Env, CacheError> {
    open_at(path.as_ref(), map_size_mb).map_err(|reason| CacheError::Unavailable {
        reason: format!("failed to open cache environment: {reason}"),
    })
}

fn open_at(path: &Path, map_size_mb: usize) -> Result<Env, String> {
    std::fs::create_dir_all(path).map_err(|e| e.to_string())?;

    unsafe {
        EnvOpenOptions::new()
            .map_size(map_size_mb * 1024 * 1024)
            .max_dbs(3)
            .open(path)
    }
    .map_err(|e| e.to_string())
}

/// Create or open the named database inside `env`.
pub(crate) fn create_database(
    env: &Env,
    name: &str,
) -> Result<Database<Bytes, Bytes>, heed::Error> {
    let mut wtxn = env.write_txn()?;
    let db = env.create_database(&mut wtxn, Some(name))?;
    wtxn.commit()?;
    Ok(db)
}

/// `prefix` followed by the separator; every key under that prefix starts
/// with these bytes.
pub(crate) fn scoped_prefix(prefix: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(prefix.len() + 1);
    bytes.extend_from_slice(prefix.as_bytes());
    bytes.push(KEY_SEPARATOR);
    bytes
}
