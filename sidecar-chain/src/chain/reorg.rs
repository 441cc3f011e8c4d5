//! Fork resolution.
//!
//! When the node declares a block canonical that does not extend the
//! current tip, the datastore walks both branches back to their common
//! ancestor, demotes the old branch and promotes the new one. All of it is
//! staged into the same batch as the block that triggered it.

use std::fmt;

use sidecar_core::{format_hash, Block, ChainTip, Hash32, TxType};
use sidecar_storage::keys::{
    block_by_hash_key, canonical_block_by_height_key, canonical_contract_key, canonical_tx_key,
    canonical_tx_position_key, contract_by_block_key, microblock_key, tx_by_block_key, tx_key,
};
use sidecar_storage::{KvRead, StagedBatch};

use super::records;
use crate::error::{ChainError, ChainResult};
use crate::mempool;

/// Where a block stands while the datastore decides its canonicality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchState {
    /// Declared canonical and built directly on the tip.
    ExtendingTip,
    /// Declared canonical but built on some other block.
    CompetingFork,
    /// On the canonical chain.
    ResolvedCanonical,
    /// Stored off the canonical chain.
    ResolvedOrphan,
}

impl fmt::Display for BranchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BranchState::ExtendingTip => "extending_tip",
            BranchState::CompetingFork => "competing_fork",
            BranchState::ResolvedCanonical => "resolved_canonical",
            BranchState::ResolvedOrphan => "resolved_orphan",
        };
        f.write_str(name)
    }
}

pub(crate) fn log_transition(block: &Block, from: Option<BranchState>, to: BranchState) {
    match from {
        Some(from) => tracing::debug!(
            block = %format_hash(&block.block_hash),
            height = block.block_height,
            %from,
            %to,
            "branch state"
        ),
        None => tracing::debug!(
            block = %format_hash(&block.block_hash),
            height = block.block_height,
            %to,
            "branch state"
        ),
    }
}

/// The two branches hanging off a common ancestor.
#[derive(Clone, Debug)]
pub struct Fork {
    /// Most recent block shared by both branches.
    pub ancestor: Block,
    /// Blocks leaving the canonical chain, from the old tip downwards.
    pub orphaned: Vec<Block>,
    /// Blocks joining the canonical chain, from the ancestor upwards.
    pub promoted: Vec<Block>,
}

/// Find the common ancestor of the current tip and a new head.
///
/// Heights are equalized first, then both branches step back together.
/// Fails if a parent is missing, if a root is reached on either side
/// without meeting, or if more than `max_depth` canonical blocks would be
/// orphaned.
///
/// Only the orphaned side counts against `max_depth`. The promoted side is
/// made of blocks already stored, so its walk ends at the ancestor or at a
/// missing parent, and a long promoted run undoes no history.
pub fn find_fork_point(
    view: &dyn KvRead,
    old_tip: &ChainTip,
    new_head: &Block,
    max_depth: u64,
) -> ChainResult<Fork> {
    let inconsistency = |reason: String| ChainError::ReorgInconsistency {
        old_tip: old_tip.block_hash,
        new_head: new_head.block_hash,
        reason,
    };
    let parent_of = |block: &Block| -> ChainResult<Block> {
        records::block_by_hash(view, &block.parent_block_hash)?.ok_or_else(|| {
            inconsistency(format!(
                "parent {} of block {} at height {} is unknown",
                format_hash(&block.parent_block_hash),
                format_hash(&block.block_hash),
                block.block_height
            ))
        })
    };
    let check_depth = |orphaned: &[Block]| -> ChainResult<()> {
        if orphaned.len() as u64 > max_depth {
            return Err(inconsistency(format!(
                "fork is deeper than the maximum reorg depth of {max_depth}"
            )));
        }
        Ok(())
    };

    let mut a = records::block_by_hash(view, &old_tip.block_hash)?
        .ok_or_else(|| inconsistency("tip block is not stored".into()))?;
    let mut b = new_head.clone();
    let mut orphaned = Vec::new();
    let mut promoted = Vec::new();

    while a.block_height > b.block_height {
        let parent = parent_of(&a)?;
        orphaned.push(std::mem::replace(&mut a, parent));
        check_depth(&orphaned)?;
    }

    while b.block_height > a.block_height {
        let parent = parent_of(&b)?;
        promoted.push(std::mem::replace(&mut b, parent));
    }

    while a.block_hash != b.block_hash {
        let parent_a = parent_of(&a)?;
        let parent_b = parent_of(&b)?;
        orphaned.push(std::mem::replace(&mut a, parent_a));
        promoted.push(std::mem::replace(&mut b, parent_b));
        check_depth(&orphaned)?;
    }

    promoted.reverse();
    Ok(Fork {
        ancestor: a,
        orphaned,
        promoted,
    })
}

/// Stage the canonical flag of a run of blocks and every row that depends
/// on them.
///
/// Demoting a block returns its non-coinbase transactions to the mempool;
/// promoting one prunes them. Demotions must be staged before promotions
/// so that rows shared by both branches end up with the promoted branch.
pub fn flip_subtree(
    staged: &mut StagedBatch<'_>,
    blocks: &[Block],
    canonical: bool,
) -> ChainResult<()> {
    for block in blocks {
        flip_block(staged, block, canonical)?;
    }
    Ok(())
}

fn flip_block(staged: &mut StagedBatch<'_>, block: &Block, canonical: bool) -> ChainResult<()> {
    let hash = block.block_hash;
    let height = block.block_height;

    let mut stored = records::block_by_hash(&*staged, &hash)?.ok_or_else(|| {
        ChainError::Corrupt(format!("block {} vanished while staging", format_hash(&hash)))
    })?;
    stored.canonical = canonical;
    records::write(staged, block_by_hash_key(&hash), &stored)?;

    if canonical {
        staged.put(canonical_block_by_height_key(height), hash.to_vec());
    } else if points_at(&*staged, &canonical_block_by_height_key(height), &hash)? {
        staged.delete(canonical_block_by_height_key(height));
    }

    for mut tx in records::block_transactions(&*staged, &hash)? {
        tx.canonical = canonical;
        records::write(staged, tx_key(&tx.tx_id, &tx.index_block_hash), &tx)?;
        records::write(staged, tx_by_block_key(&hash, tx.tx_index), &tx)?;

        let position = canonical_tx_position_key(height, tx.tx_index, &tx.tx_id);
        if canonical {
            staged.put(canonical_tx_key(&tx.tx_id), tx.index_block_hash.to_vec());
            staged.put(position, tx.index_block_hash.to_vec());
            mempool::stage_prune(staged, &tx.tx_id)?;
        } else {
            if points_at(&*staged, &canonical_tx_key(&tx.tx_id), &tx.index_block_hash)? {
                staged.delete(canonical_tx_key(&tx.tx_id));
            }
            staged.delete(position);
            if tx.tx_type != TxType::Coinbase {
                mempool::stage_restore(staged, &tx, stored.burn_block_time)?;
            }
        }
    }

    for mut contract in records::block_contracts(&*staged, &hash)? {
        contract.canonical = canonical;
        records::write(
            staged,
            contract_by_block_key(&hash, &contract.contract_id),
            &contract,
        )?;
        let pointer = canonical_contract_key(&contract.contract_id);
        if canonical {
            staged.put(pointer, hash.to_vec());
        } else if points_at(&*staged, &pointer, &hash)? {
            staged.delete(pointer);
        }
    }

    for mut microblock in records::anchored_microblocks(&*staged, &block.index_block_hash)? {
        microblock.canonical = canonical;
        records::write(
            staged,
            microblock_key(
                &block.index_block_hash,
                microblock.microblock_sequence,
                &microblock.microblock_hash,
            ),
            &microblock,
        )?;
    }

    Ok(())
}

fn points_at(view: &dyn KvRead, key: &[u8], target: &Hash32) -> ChainResult<bool> {
    Ok(view.get(key)?.as_deref() == Some(&target[..]))
}
