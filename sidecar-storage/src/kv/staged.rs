//! Staged writes over a read view.
//!
//! An ingest reads the store, decides what to change, and must commit all
//! of it as one batch. `StagedBatch` collects those changes and answers
//! reads as if they had already been applied, so later steps of the same
//! ingest see earlier ones.

use std::collections::BTreeMap;

use super::{KvEntry, KvRead, PrefixIterator, WriteBatch};
use crate::error::StorageError;

/// Pending puts and deletes layered over a base view.
pub struct StagedBatch<'a> {
    base: &'a dyn KvRead,
    /// `None` marks a staged delete.
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> StagedBatch<'a> {
    /// Start staging over `base`.
    pub fn new(base: &'a dyn KvRead) -> Self {
        Self {
            base,
            overlay: BTreeMap::new(),
        }
    }

    /// Stage a put. Replaces any earlier staged change to the key.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.overlay.insert(key, Some(value));
    }

    /// Stage a delete. Replaces any earlier staged change to the key.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.overlay.insert(key, None);
    }

    /// Number of distinct keys touched.
    pub fn len(&self) -> usize {
        self.overlay.len()
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }

    /// Convert the staged changes into a write batch, one operation per key.
    pub fn into_write_batch(self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for (key, value) in self.overlay {
            match value {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        batch
    }

    fn merged(&self, prefix: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, StorageError> {
        let mut merged = BTreeMap::new();
        for item in self.base.prefix_iterator(prefix)? {
            let (k, v) = item?;
            merged.insert(k, v);
        }
        for (k, v) in self
            .overlay
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match v {
                Some(v) => {
                    merged.insert(k.clone(), v.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        Ok(merged)
    }
}

impl KvRead for StagedBatch<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        match self.overlay.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.base.get(key),
        }
    }

    fn prefix_iterator(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        let entries: Vec<KvEntry> = self.merged(prefix)?.into_iter().collect();
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn prefix_iterator_rev(&self, prefix: &[u8]) -> Result<PrefixIterator<'_>, StorageError> {
        let entries: Vec<KvEntry> = self.merged(prefix)?.into_iter().rev().collect();
        Ok(Box::new(entries.into_iter().map(Ok)))
    }
}
