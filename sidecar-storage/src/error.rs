//! Errors surfaced by the key-value layer.

use thiserror::Error;

/// Failure reading or writing the datastore.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The RocksDB engine reported a failure.
    #[error("rocksdb: {0}")]
    RocksDb(String),

    /// A stored key did not decode into the expected layout.
    #[error("malformed key: {0}")]
    InvalidKey(String),
}

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        StorageError::RocksDb(e.to_string())
    }
}
