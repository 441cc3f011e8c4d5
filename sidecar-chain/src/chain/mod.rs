//! Block storage, canonicality and fork resolution.

pub(crate) mod records;
mod reorg;
pub(crate) mod store;

pub use reorg::{find_fork_point, flip_subtree, BranchState, Fork};
pub use store::{
    BlockQuery, ChainConfig, ChainStats, ChainStore, IngestOutcome, MempoolOutcome,
    DEFAULT_MAX_REORG_DEPTH,
};
