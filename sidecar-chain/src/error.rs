//! Chain error types.

use std::fmt;

use sidecar_core::SerializationError;
use sidecar_storage::StorageError;

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors that can occur during datastore operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainError {
    /// The underlying key-value store failed. Nothing was written.
    Storage(String),

    /// A stored record could not be decoded.
    Corrupt(String),

    /// A block's dependent rows do not belong to it.
    InvalidBlock { hash: [u8; 32], reason: String },

    /// A block does not sit one above its known parent.
    InvalidHeight { expected: u64, actual: u64 },

    /// Fork resolution could not find a consistent common ancestor.
    ///
    /// Fatal: the datastore halts ingest until restarted.
    ReorgInconsistency {
        old_tip: [u8; 32],
        new_head: [u8; 32],
        reason: String,
    },

    /// Ingest was halted by an earlier reorg inconsistency.
    IngestHalted { reason: String },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::Storage(e) => write!(f, "storage error: {e}"),
            ChainError::Corrupt(e) => write!(f, "corrupt record: {e}"),
            ChainError::InvalidBlock { hash, reason } => {
                write!(f, "invalid block {}: {reason}", hex(&hash[..4]))
            }
            ChainError::InvalidHeight { expected, actual } => {
                write!(f, "invalid block height: expected {expected}, got {actual}")
            }
            ChainError::ReorgInconsistency {
                old_tip,
                new_head,
                reason,
            } => {
                write!(
                    f,
                    "reorg inconsistency resolving {} -> {}: {reason}",
                    hex(&old_tip[..4]),
                    hex(&new_head[..4])
                )
            }
            ChainError::IngestHalted { reason } => {
                write!(f, "ingest halted: {reason}")
            }
        }
    }
}

impl std::error::Error for ChainError {}

impl From<StorageError> for ChainError {
    fn from(err: StorageError) -> Self {
        ChainError::Storage(err.to_string())
    }
}

impl From<SerializationError> for ChainError {
    fn from(err: SerializationError) -> Self {
        ChainError::Corrupt(err.to_string())
    }
}

/// Helper to format bytes as hex.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
