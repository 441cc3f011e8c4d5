//! Block-level records.

use serde::{Deserialize, Serialize};

use super::hash::Hash32;

/// An anchored block as reported by the chain node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block hash.
    pub block_hash: Hash32,
    /// Index block hash. Unique across forks that share a block hash.
    pub index_block_hash: Hash32,
    /// Hash of the parent block.
    pub parent_block_hash: Hash32,
    /// Index block hash of the parent block.
    pub parent_index_block_hash: Hash32,
    /// Height in the chain.
    pub block_height: u64,
    /// Burn-chain block this block was anchored in.
    pub burn_block_hash: Hash32,
    /// Height of the anchoring burn-chain block.
    pub burn_block_height: u64,
    /// Timestamp of the anchoring burn-chain block, in seconds.
    pub burn_block_time: u64,
    /// Whether the block is on the canonical chain.
    pub canonical: bool,
}

impl Block {
    /// The tip record naming this block.
    pub fn tip(&self) -> ChainTip {
        ChainTip {
            block_height: self.block_height,
            block_hash: self.block_hash,
            index_block_hash: self.index_block_hash,
        }
    }
}

/// A microblock streamed between anchored blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Microblock {
    /// Microblock hash.
    pub microblock_hash: Hash32,
    /// Position in the stream. Sequence 0 follows the anchor directly.
    pub microblock_sequence: u32,
    /// Hash of the preceding microblock, or the anchor block hash for sequence 0.
    pub microblock_parent_hash: Hash32,
    /// Index block hash of the anchored block this stream builds on.
    pub parent_index_block_hash: Hash32,
    /// Inherited from the anchoring block.
    pub canonical: bool,
}

/// A burn-chain block notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnBlock {
    /// Burn block hash.
    pub burn_block_hash: Hash32,
    /// Burn block height.
    pub burn_block_height: u64,
    /// Burn block timestamp, in seconds.
    pub burn_block_time: u64,
}

/// The highest canonical block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    /// Height of the tip block.
    pub block_height: u64,
    /// Hash of the tip block.
    pub block_hash: Hash32,
    /// Index block hash of the tip block.
    pub index_block_hash: Hash32,
}
