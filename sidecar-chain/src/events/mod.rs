//! Chain-node event intake.
//!
//! Payloads are decoded into [`RawEvent`], validated into an [`IngestOp`]
//! and only then handed to the datastore. A payload that fails validation
//! never touches storage.

mod normalize;
mod raw;

pub use normalize::{normalize, BlockIngest, IngestOp, NormalizeError};
pub use raw::{
    RawBlock, RawBurnBlock, RawContractDeploy, RawDroppedTransactions, RawEvent,
    RawMempoolTransaction, RawMicroblock, RawMicroblocks, RawTransaction,
};

use crate::chain::{ChainStore, IngestOutcome, MempoolOutcome};
use crate::error::ChainResult;

/// Summary of one applied operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    Block(IngestOutcome),
    BurnBlock { stored: bool },
    Microblocks { stored: usize },
    Mempool { added: usize, absorbed: usize },
    Dropped { pruned: usize },
}

/// Apply a validated operation to the datastore.
///
/// Mempool operations touch one transaction per write; a failure part way
/// leaves the earlier ones applied, which is safe because redelivery is
/// idempotent.
pub fn apply(store: &ChainStore, op: IngestOp) -> ChainResult<Applied> {
    match op {
        IngestOp::Block(ingest) => {
            let BlockIngest {
                block,
                transactions,
                contracts,
                microblocks,
            } = *ingest;
            store
                .ingest_block(block, transactions, contracts, microblocks)
                .map(Applied::Block)
        }
        IngestOp::BurnBlock(burn_block) => Ok(Applied::BurnBlock {
            stored: store.ingest_burn_block(burn_block)?,
        }),
        IngestOp::Microblocks(microblocks) => Ok(Applied::Microblocks {
            stored: store.ingest_microblocks(microblocks)?,
        }),
        IngestOp::MempoolTransactions(txs) => {
            let mut added = 0;
            let mut absorbed = 0;
            for tx in txs {
                match store.ingest_mempool_transaction(tx)? {
                    MempoolOutcome::Added => added += 1,
                    MempoolOutcome::Duplicate | MempoolOutcome::AlreadyMined => absorbed += 1,
                }
            }
            Ok(Applied::Mempool { added, absorbed })
        }
        IngestOp::DropMempoolTransactions(tx_ids) => {
            let mut pruned = 0;
            for tx_id in &tx_ids {
                if store.prune_mempool_transaction(tx_id)? {
                    pruned += 1;
                }
            }
            Ok(Applied::Dropped { pruned })
        }
    }
}
