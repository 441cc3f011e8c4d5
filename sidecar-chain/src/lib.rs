//! Canonical chain datastore for the chain event sidecar.
//!
//! This crate implements:
//! - Block, transaction, contract, microblock and mempool storage
//! - Canonicality tracking driven by the node's declarations
//! - Fork resolution with an atomic flip of the losing and winning branches
//! - Mempool pruning and restoration across reorgs
//! - Offset pagination and a validating query service
//! - Normalization of raw node events into typed ingest operations
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sidecar_chain::{ChainConfig, ChainStore};
//! use sidecar_storage::MemoryBackend;
//!
//! let store = ChainStore::open(Arc::new(MemoryBackend::new()), ChainConfig::default())?;
//! assert!(store.chain_tip()?.is_none());
//! ```

mod chain;
mod error;
pub mod events;
mod mempool;
mod page;
mod query;

pub use chain::{
    find_fork_point, flip_subtree, BlockQuery, BranchState, ChainConfig, ChainStats, ChainStore,
    Fork, IngestOutcome, MempoolOutcome, DEFAULT_MAX_REORG_DEPTH,
};
pub use error::{ChainError, ChainResult};
pub use page::{Order, Page};
pub use query::{
    PageLimits, PageRequest, QueryError, QueryService, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
