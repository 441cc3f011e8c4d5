//! In-memory key-value backend for testing.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{prefix_upper_bound, BatchOp, KvBackend, KvEntry, KvRead, PrefixIterator, WriteBatch};
use crate::error::StorageError;

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory key-value backend using a copy-on-write BTreeMap.
///
/// Snapshots share the current map through an `Arc`. A write that arrives
/// while a snapshot is alive clones the map first, so the snapshot keeps
/// seeing the old contents.
pub struct MemoryBackend {
    data: RwLock<Arc<Map>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Arc::new(BTreeMap::new())),
        }
    }

    /// Get the number of entries in the store.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn current(&self) -> Arc<Map> {
        Arc::clone(&self.data.read())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn scan(map: &Map, prefix: &[u8], reverse: bool) -> Vec<KvEntry> {
    let upper = match prefix_upper_bound(prefix) {
        Some(upper) => Bound::Excluded(upper),
        None => Bound::Unbounded,
    };
    let range = map.range::<Vec<u8>, _>((Bound::Included(prefix.to_vec()), upper));
    if reverse {
        range.rev().map(|(k, v)| (k.clone(), v.clone())).collect()
    } else {
        range.map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl KvRead for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn prefix_iterator(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        let entries = scan(&self.current(), prefix, false);
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn prefix_iterator_rev(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        let entries = scan(&self.current(), prefix, true);
        Ok(Box::new(entries.into_iter().map(Ok)))
    }
}

impl KvBackend for MemoryBackend {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut data = self.data.write();
        Arc::make_mut(&mut data).insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        let mut data = self.data.write();
        Arc::make_mut(&mut data).remove(key);
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut guard = self.data.write();
        let data = Arc::make_mut(&mut guard);
        for op in batch.operations {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Box<dyn KvRead + '_> {
        Box::new(MemorySnapshot {
            data: self.current(),
        })
    }
}

/// A frozen view of a `MemoryBackend`.
pub struct MemorySnapshot {
    data: Arc<Map>,
}

impl KvRead for MemorySnapshot {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.get(key).cloned())
    }

    fn prefix_iterator(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        Ok(Box::new(scan(&self.data, prefix, false).into_iter().map(Ok)))
    }

    fn prefix_iterator_rev(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        Ok(Box::new(scan(&self.data, prefix, true).into_iter().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::tests::collect;

    #[test]
    fn test_new_is_empty() {
        let backend = MemoryBackend::new();
        assert!(backend.is_empty());
        assert_eq!(backend.len(), 0);
    }

    #[test]
    fn test_overwrite() {
        let backend = MemoryBackend::new();
        backend.put(b"key", b"value1").unwrap();
        backend.put(b"key", b"value2").unwrap();

        assert_eq!(backend.len(), 1);
        assert_eq!(backend.get(b"key").unwrap(), Some(b"value2".to_vec()));
    }

    #[test]
    fn test_prefix_iterator_empty_prefix() {
        let backend = MemoryBackend::new();
        backend.put(b"a", b"1").unwrap();
        backend.put(b"b", b"2").unwrap();

        assert_eq!(collect(backend.prefix_iterator(b"").unwrap()).len(), 2);
        let reverse = collect(backend.prefix_iterator_rev(b"").unwrap());
        assert_eq!(reverse[0].0, b"b".to_vec());
    }

    #[test]
    fn test_prefix_iterator_no_matches() {
        let backend = MemoryBackend::new();
        backend.put(b"abc", b"1").unwrap();
        backend.put(b"abd", b"2").unwrap();

        assert!(collect(backend.prefix_iterator(b"xyz").unwrap()).is_empty());
        assert!(collect(backend.prefix_iterator_rev(b"xyz").unwrap()).is_empty());
    }

    #[test]
    fn test_snapshot_survives_delete() {
        let backend = MemoryBackend::new();
        backend.put(b"k", b"v").unwrap();
        let snapshot = backend.snapshot();
        backend.delete(b"k").unwrap();

        assert_eq!(snapshot.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert!(backend.get(b"k").unwrap().is_none());
    }
}
