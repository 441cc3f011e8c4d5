//! RocksDB key-value backend for production use.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{DBIteratorWithThreadMode, Direction, IteratorMode, Options, Snapshot, DB};

use super::{
    prefix_upper_bound, BatchOp, KvBackend, KvEntry, KvRead, PrefixIterator, WriteBatch,
};
use crate::error::StorageError;

/// RocksDB-based key-value backend.
pub struct RocksBackend {
    db: Arc<DB>,
}

impl RocksBackend {
    /// Open or create a RocksDB database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        // Many small index rows, written in bursts during reorgs.
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(3);
        opts.set_target_file_size_base(64 * 1024 * 1024);
        opts.set_level_compaction_dynamic_level_bytes(true);

        let db = DB::open(&opts, path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened rocksdb");
        Ok(Self { db: Arc::new(db) })
    }

    /// Get estimated number of keys in the database.
    pub fn estimate_num_keys(&self) -> Option<u64> {
        self.db
            .property_int_value("rocksdb.estimate-num-keys")
            .ok()
            .flatten()
    }
}

fn forward_scan<'a>(
    iter: DBIteratorWithThreadMode<'a, DB>,
    prefix: &[u8],
) -> PrefixIterator<'a> {
    let prefix = prefix.to_vec();
    Box::new(
        iter.map(|item| {
            item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(StorageError::from)
        })
        .take_while(move |item| match item {
            Ok((k, _)) => k.starts_with(&prefix),
            Err(_) => true,
        }),
    )
}

fn reverse_scan<'a>(
    iter: DBIteratorWithThreadMode<'a, DB>,
    prefix: &[u8],
    upper: Option<Vec<u8>>,
) -> PrefixIterator<'a> {
    let entries = iter.map(|item| {
        item.map(|(k, v)| (k.to_vec(), v.to_vec()))
            .map_err(StorageError::from)
    });
    Box::new(within_prefix_rev(entries, prefix.to_vec(), upper))
}

/// Trim a reverse iterator positioned at or below `upper` to the keys
/// under `prefix`.
///
/// Only the bound key itself can sit above the prefix, so the scan stops at
/// the first key below it instead of walking the rest of the keyspace.
fn within_prefix_rev<I>(
    entries: I,
    prefix: Vec<u8>,
    upper: Option<Vec<u8>>,
) -> impl Iterator<Item = Result<KvEntry, StorageError>>
where
    I: Iterator<Item = Result<KvEntry, StorageError>>,
{
    entries
        .skip_while(move |item| match (item, &upper) {
            (Ok((k, _)), Some(upper)) => k.as_slice() >= upper.as_slice(),
            _ => false,
        })
        .take_while(move |item| match item {
            Ok((k, _)) => k.starts_with(&prefix),
            Err(_) => true,
        })
}

fn reverse_mode(upper: &Option<Vec<u8>>) -> IteratorMode<'_> {
    match upper {
        Some(upper) => IteratorMode::From(upper, Direction::Reverse),
        None => IteratorMode::End,
    }
}

impl KvRead for RocksBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.get(key)?)
    }

    fn prefix_iterator(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        let iter = self.db.iterator(IteratorMode::From(prefix, Direction::Forward));
        Ok(forward_scan(iter, prefix))
    }

    fn prefix_iterator_rev(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        let upper = prefix_upper_bound(prefix);
        let iter = self.db.iterator(reverse_mode(&upper));
        Ok(reverse_scan(iter, prefix, upper))
    }
}

impl KvBackend for RocksBackend {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.db.put(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.db.delete(key)?;
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.operations {
            match op {
                BatchOp::Put { key, value } => {
                    rocks_batch.put(&key, &value);
                }
                BatchOp::Delete { key } => {
                    rocks_batch.delete(&key);
                }
            }
        }
        self.db.write(rocks_batch)?;
        Ok(())
    }

    fn snapshot(&self) -> Box<dyn KvRead + '_> {
        Box::new(RocksSnapshot {
            snapshot: self.db.snapshot(),
        })
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

/// A RocksDB snapshot.
struct RocksSnapshot<'a> {
    snapshot: Snapshot<'a>,
}

impl KvRead for RocksSnapshot<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.snapshot.get(key)?)
    }

    fn prefix_iterator(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        let iter = self
            .snapshot
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        Ok(forward_scan(iter, prefix))
    }

    fn prefix_iterator_rev(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        let upper = prefix_upper_bound(prefix);
        let iter = self.snapshot.iterator(reverse_mode(&upper));
        Ok(reverse_scan(iter, prefix, upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::tests::{
        test_backend_basic, test_backend_batch, test_backend_prefix_iter,
        test_backend_rev_at_keyspace_end, test_backend_rev_empty_prefix,
        test_backend_snapshot_isolation,
    };
    use std::cell::Cell;
    use tempfile::TempDir;

    fn create_temp_backend() -> (RocksBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = RocksBackend::open(dir.path()).unwrap();
        (backend, dir)
    }

    #[test]
    fn test_basic_operations() {
        let (backend, _dir) = create_temp_backend();
        test_backend_basic(backend);
    }

    #[test]
    fn test_write_batch() {
        let (backend, _dir) = create_temp_backend();
        test_backend_batch(backend);
    }

    #[test]
    fn test_prefix_iterators() {
        let (backend, _dir) = create_temp_backend();
        test_backend_prefix_iter(backend);
    }

    #[test]
    fn test_reverse_at_keyspace_end() {
        let (backend, _dir) = create_temp_backend();
        test_backend_rev_at_keyspace_end(backend);
    }

    #[test]
    fn test_reverse_of_empty_prefix() {
        let (backend, _dir) = create_temp_backend();
        test_backend_rev_empty_prefix(backend);
    }

    #[test]
    fn test_reverse_scan_stops_below_prefix() {
        let pulled = Cell::new(0usize);
        let keys: Vec<Vec<u8>> = vec![
            vec![0x42],
            vec![0x10, 0x03],
            vec![0x10, 0x02],
            vec![0x10, 0x01],
        ];
        let entries = keys.into_iter().map(|k| {
            pulled.set(pulled.get() + 1);
            Ok((k, Vec::new()))
        });

        let found: Vec<_> = within_prefix_rev(entries, vec![0x41], Some(vec![0x42])).collect();
        assert!(found.is_empty());
        // The bound key and the first key below the prefix.
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_snapshot_isolation() {
        let (backend, _dir) = create_temp_backend();
        test_backend_snapshot_isolation(backend);
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();

        {
            let backend = RocksBackend::open(dir.path()).unwrap();
            backend.put(b"persistent", b"data").unwrap();
            backend.flush().unwrap();
        }

        {
            let backend = RocksBackend::open(dir.path()).unwrap();
            assert_eq!(backend.get(b"persistent").unwrap(), Some(b"data".to_vec()));
        }
    }
}
