//! # Sidecar Storage
//!
//! Ordered key-value storage for the chain event sidecar.
//!
//! This crate provides:
//! - Disk-backed storage via RocksDB and an in-memory backend for tests
//! - Point-in-time snapshots that readers use while ingest writes continue
//! - Forward and reverse prefix iteration
//! - Atomic write batches, plus a staged overlay that lets an ingest read
//!   its own pending writes before committing them in one batch
//! - The key schema: one-byte table prefixes and big-endian composite keys
//!
//! ## Architecture
//!
//! Every logical table is a key prefix in a single keyspace. Heights and
//! positions are encoded big-endian so lexicographic key order is chain
//! order, which makes "most recent first" a reverse prefix scan.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod keys;
pub mod kv;

pub use error::StorageError;
pub use keys::KeyPrefix;
pub use kv::{
    BatchOp, KvBackend, KvRead, MemoryBackend, PrefixIterator, RocksBackend, StagedBatch,
    WriteBatch,
};
