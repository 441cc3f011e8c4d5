//! Key-value storage backends.
//!
//! This module provides an abstraction over key-value storage with two implementations:
//! - `MemoryBackend`: In-memory BTreeMap-based storage for testing
//! - `RocksBackend`: RocksDB-based persistent storage for production
//!
//! Reads go through `KvRead`, which both backends and their snapshots
//! implement. Writes go through `KvBackend`.

mod memory_backend;
mod rocks_backend;
mod staged;

pub use memory_backend::{MemoryBackend, MemorySnapshot};
pub use rocks_backend::RocksBackend;
pub use staged::StagedBatch;

use crate::error::StorageError;

/// Item yielded by prefix iterators.
pub type KvEntry = (Vec<u8>, Vec<u8>);

/// Type alias for the iterator returned by the prefix scans.
pub type PrefixIterator<'a> = Box<dyn Iterator<Item = Result<KvEntry, StorageError>> + 'a>;

/// Read access to an ordered keyspace.
pub trait KvRead {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate over all keys with a given prefix in ascending key order.
    fn prefix_iterator(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError>;

    /// Iterate over all keys with a given prefix in descending key order.
    fn prefix_iterator_rev(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError>;
}

/// Trait for key-value storage backends.
///
/// Implementations must provide atomic batch writes, ordered iteration and
/// snapshots that are unaffected by later writes.
pub trait KvBackend: KvRead + Send + Sync {
    /// Put a key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.
    fn delete(&self, key: &[u8]) -> Result<(), StorageError>;

    /// Apply a batch of writes atomically.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;

    /// Take a consistent point-in-time view of the keyspace.
    fn snapshot(&self) -> Box<dyn KvRead + '_>;

    /// Flush any buffered data to disk (if applicable).
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// `None` when no such key exists (empty prefix or all `0xff`).
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < 0xff {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// A batch of write operations to be applied atomically.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    /// Operations in the batch.
    pub operations: Vec<BatchOp>,
}

/// A single operation in a write batch.
#[derive(Clone, Debug)]
pub enum BatchOp {
    /// Put a key-value pair.
    Put {
        /// The key to write.
        key: Vec<u8>,
        /// The value to write.
        value: Vec<u8>,
    },
    /// Delete a key.
    Delete {
        /// The key to delete.
        key: Vec<u8>,
    },
}

impl WriteBatch {
    /// Create a new empty write batch.
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Add a put operation to the batch.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.operations.push(BatchOp::Put { key, value });
    }

    /// Add a delete operation to the batch.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.operations.push(BatchOp::Delete { key });
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Get the number of operations in the batch.
    pub fn len(&self) -> usize {
        self.operations.len()
    }
}
