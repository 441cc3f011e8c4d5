//! The canonical chain datastore.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use sidecar_core::{
    format_hash, parse_hash, Block, BurnBlock, ChainTip, FoundOrNot, Hash32, MempoolTransaction,
    Microblock, SmartContract, Transaction,
};
use sidecar_storage::keys::{
    block_by_hash_key, block_by_height_key, block_hash_by_index_hash_key, burn_block_key,
    chain_tip_key, contract_by_block_key, hash_at, microblock_key, table_prefix, tx_by_block_key,
    tx_key, KeyPrefix,
};
use sidecar_storage::{KvBackend, KvRead, StagedBatch};

use super::records;
use super::reorg::{self, log_transition, BranchState};
use crate::error::{ChainError, ChainResult};
use crate::mempool;
use crate::page::{paginate, Order, Page};

/// Deepest reorg resolved before ingest halts.
pub const DEFAULT_MAX_REORG_DEPTH: u64 = 100;

/// Datastore settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    /// Maximum number of canonical blocks a single reorg may orphan.
    pub max_reorg_depth: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_reorg_depth: DEFAULT_MAX_REORG_DEPTH,
        }
    }
}

/// What ingesting a block did to the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The block was already stored with the same canonicality.
    Duplicate,
    /// The first canonical block became the root of the chain.
    Genesis { tip: ChainTip },
    /// The block was appended on top of the tip.
    Extended { tip: ChainTip },
    /// The canonical chain switched branches.
    Reorganized {
        old_tip: ChainTip,
        new_tip: ChainTip,
        /// Height of the common ancestor.
        fork_height: u64,
        /// Blocks demoted from the old branch.
        orphaned: usize,
        /// Blocks promoted on the new branch, including the head.
        promoted: usize,
    },
    /// The block was stored off the canonical chain.
    StoredOrphan,
}

impl IngestOutcome {
    /// The tip after this ingest, if it moved.
    pub fn new_tip(&self) -> Option<ChainTip> {
        match self {
            IngestOutcome::Genesis { tip } | IngestOutcome::Extended { tip } => Some(*tip),
            IngestOutcome::Reorganized { new_tip, .. } => Some(*new_tip),
            IngestOutcome::Duplicate | IngestOutcome::StoredOrphan => None,
        }
    }
}

/// What ingesting a mempool transaction did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MempoolOutcome {
    /// Stored as pending.
    Added,
    /// Already known to the mempool.
    Duplicate,
    /// Already mined in a canonical block; ignored.
    AlreadyMined,
}

/// Block lookup key: a `0x` hash or a canonical height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockQuery {
    /// Any stored block by hash.
    Hash(Hash32),
    /// The canonical block at a height.
    Height(u64),
}

impl FromStr for BlockQuery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") {
            return parse_hash(s)
                .map(BlockQuery::Hash)
                .map_err(|e| format!("invalid block hash: {e}"));
        }
        s.parse::<u64>()
            .map(BlockQuery::Height)
            .map_err(|_| format!("expected a 0x block hash or a height, got {s:?}"))
    }
}

/// Counters for the status endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainStats {
    pub tip: Option<ChainTip>,
    pub blocks: usize,
    pub canonical_blocks: usize,
    pub canonical_transactions: usize,
    pub pending_transactions: usize,
    pub halted: Option<String>,
}

/// Stores blocks as the node reports them and keeps exactly one canonical
/// chain.
///
/// Writers are serialized through the tip lock and commit each ingest as a
/// single batch. Readers never take that lock: each read opens a snapshot,
/// so it sees either all or none of any ingest.
pub struct ChainStore {
    backend: Arc<dyn KvBackend>,
    config: ChainConfig,
    tip: Mutex<Option<ChainTip>>,
    halted: RwLock<Option<String>>,
}

impl ChainStore {
    /// Open a datastore over `backend`, resuming from its stored tip.
    pub fn open(backend: Arc<dyn KvBackend>, config: ChainConfig) -> ChainResult<Self> {
        let tip = {
            let snapshot = backend.snapshot();
            records::chain_tip(snapshot.as_ref())?
        };
        match &tip {
            Some(tip) => tracing::info!(
                height = tip.block_height,
                hash = %format_hash(&tip.block_hash),
                "resuming from stored tip"
            ),
            None => tracing::info!("empty datastore"),
        }
        Ok(Self {
            backend,
            config,
            tip: Mutex::new(tip),
            halted: RwLock::new(None),
        })
    }

    /// The backend this store writes to.
    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    /// Datastore settings.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Why ingest is halted, if it is.
    pub fn halted(&self) -> Option<String> {
        self.halted.read().clone()
    }

    fn check_halted(&self) -> ChainResult<()> {
        match self.halted.read().as_ref() {
            Some(reason) => Err(ChainError::IngestHalted {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn halt(&self, err: &ChainError) {
        tracing::error!(error = %err, "halting ingest");
        *self.halted.write() = Some(err.to_string());
    }

    /// Stage changes over a fresh snapshot and commit them as one batch.
    fn write_staged<T>(
        &self,
        stage: impl FnOnce(&mut StagedBatch<'_>) -> ChainResult<T>,
    ) -> ChainResult<T> {
        let snapshot = self.backend.snapshot();
        let mut staged = StagedBatch::new(snapshot.as_ref());
        let out = stage(&mut staged)?;
        if !staged.is_empty() {
            let batch = staged.into_write_batch();
            drop(snapshot);
            self.backend.write_batch(batch)?;
        }
        Ok(out)
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    /// Ingest a block with its transactions, contracts and microblocks.
    ///
    /// The block's `canonical` flag is the node's declaration. A canonical
    /// block that does not extend the tip triggers a reorg; a non-canonical
    /// one is stored as an orphan. Re-ingesting a stored block is a no-op
    /// unless it was an orphan and is now declared canonical.
    pub fn ingest_block(
        &self,
        block: Block,
        transactions: Vec<Transaction>,
        contracts: Vec<SmartContract>,
        microblocks: Vec<Microblock>,
    ) -> ChainResult<IngestOutcome> {
        let mut tip = self.tip.lock();
        self.check_halted()?;
        validate_rows(&block, &transactions, &contracts)?;

        let current = *tip;
        let result = self.write_staged(|staged| {
            self.stage_block(staged, current, block, transactions, contracts, microblocks)
        });
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if matches!(err, ChainError::ReorgInconsistency { .. }) {
                    self.halt(&err);
                }
                return Err(err);
            }
        };

        if let Some(new_tip) = outcome.new_tip() {
            *tip = Some(new_tip);
        }
        match &outcome {
            IngestOutcome::Reorganized {
                old_tip,
                new_tip,
                fork_height,
                orphaned,
                promoted,
            } => tracing::warn!(
                old_tip = %format_hash(&old_tip.block_hash),
                new_tip = %format_hash(&new_tip.block_hash),
                fork_height,
                orphaned,
                promoted,
                "chain reorganized"
            ),
            IngestOutcome::Genesis { tip } | IngestOutcome::Extended { tip } => tracing::info!(
                height = tip.block_height,
                hash = %format_hash(&tip.block_hash),
                "new chain tip"
            ),
            IngestOutcome::StoredOrphan => tracing::info!("stored non-canonical block"),
            IngestOutcome::Duplicate => tracing::debug!("duplicate block ignored"),
        }
        Ok(outcome)
    }

    fn stage_block(
        &self,
        staged: &mut StagedBatch<'_>,
        tip: Option<ChainTip>,
        block: Block,
        transactions: Vec<Transaction>,
        contracts: Vec<SmartContract>,
        microblocks: Vec<Microblock>,
    ) -> ChainResult<IngestOutcome> {
        if let Some(stored) = records::block_by_hash(&*staged, &block.block_hash)? {
            if stored.canonical || !block.canonical {
                return Ok(IngestOutcome::Duplicate);
            }
            return match tip {
                None => self.stage_root(staged, &stored),
                Some(tip) => {
                    log_transition(
                        &stored,
                        Some(BranchState::ResolvedOrphan),
                        BranchState::CompetingFork,
                    );
                    self.stage_reorg(staged, tip, &stored)
                }
            };
        }

        if let Some(parent) = records::block_by_hash(&*staged, &block.parent_block_hash)? {
            let expected = parent.block_height + 1;
            if block.block_height != expected {
                return Err(ChainError::InvalidHeight {
                    expected,
                    actual: block.block_height,
                });
            }
        }

        stage_new_rows(staged, &block, transactions, contracts, microblocks)?;

        if !block.canonical {
            log_transition(&block, None, BranchState::ResolvedOrphan);
            return Ok(IngestOutcome::StoredOrphan);
        }
        match tip {
            None => self.stage_root(staged, &block),
            Some(tip) if block.parent_block_hash == tip.block_hash => {
                log_transition(&block, None, BranchState::ExtendingTip);
                reorg::flip_subtree(staged, std::slice::from_ref(&block), true)?;
                log_transition(
                    &block,
                    Some(BranchState::ExtendingTip),
                    BranchState::ResolvedCanonical,
                );
                records::write(staged, chain_tip_key(), &block.tip())?;
                Ok(IngestOutcome::Extended { tip: block.tip() })
            }
            Some(tip) => {
                log_transition(&block, None, BranchState::CompetingFork);
                self.stage_reorg(staged, tip, &block)
            }
        }
    }

    fn stage_root(&self, staged: &mut StagedBatch<'_>, block: &Block) -> ChainResult<IngestOutcome> {
        reorg::flip_subtree(staged, std::slice::from_ref(block), true)?;
        log_transition(block, None, BranchState::ResolvedCanonical);
        records::write(staged, chain_tip_key(), &block.tip())?;
        Ok(IngestOutcome::Genesis { tip: block.tip() })
    }

    fn stage_reorg(
        &self,
        staged: &mut StagedBatch<'_>,
        old_tip: ChainTip,
        head: &Block,
    ) -> ChainResult<IngestOutcome> {
        let fork = reorg::find_fork_point(&*staged, &old_tip, head, self.config.max_reorg_depth)?;

        reorg::flip_subtree(staged, &fork.orphaned, false)?;
        for block in &fork.orphaned {
            log_transition(
                block,
                Some(BranchState::ResolvedCanonical),
                BranchState::ResolvedOrphan,
            );
        }
        reorg::flip_subtree(staged, &fork.promoted, true)?;
        for block in &fork.promoted {
            let from = if block.block_hash == head.block_hash {
                BranchState::CompetingFork
            } else {
                BranchState::ResolvedOrphan
            };
            log_transition(block, Some(from), BranchState::ResolvedCanonical);
        }

        let new_tip = head.tip();
        records::write(staged, chain_tip_key(), &new_tip)?;

        if fork.orphaned.is_empty() {
            return Ok(IngestOutcome::Extended { tip: new_tip });
        }
        Ok(IngestOutcome::Reorganized {
            old_tip,
            new_tip,
            fork_height: fork.ancestor.block_height,
            orphaned: fork.orphaned.len(),
            promoted: fork.promoted.len(),
        })
    }

    /// Ingest a microblock stream. Returns how many were newly stored.
    pub fn ingest_microblocks(&self, microblocks: Vec<Microblock>) -> ChainResult<usize> {
        let _tip = self.tip.lock();
        self.check_halted()?;
        let stored = self.write_staged(|staged| {
            let mut stored = 0;
            for microblock in microblocks {
                if stage_microblock(staged, microblock)? {
                    stored += 1;
                }
            }
            Ok(stored)
        })?;
        tracing::debug!(stored, "ingested microblocks");
        Ok(stored)
    }

    /// Record a burn block. Returns false if it was already stored.
    pub fn ingest_burn_block(&self, burn_block: BurnBlock) -> ChainResult<bool> {
        let _tip = self.tip.lock();
        self.check_halted()?;
        self.write_staged(|staged| {
            let key = burn_block_key(&burn_block.burn_block_hash);
            if records::read::<BurnBlock>(&*staged, &key)?.as_ref() == Some(&burn_block) {
                return Ok(false);
            }
            records::write(staged, key, &burn_block)?;
            tracing::debug!(height = burn_block.burn_block_height, "stored burn block");
            Ok(true)
        })
    }

    /// Add a transaction to the pending set.
    pub fn ingest_mempool_transaction(
        &self,
        tx: MempoolTransaction,
    ) -> ChainResult<MempoolOutcome> {
        let _tip = self.tip.lock();
        self.check_halted()?;
        self.write_staged(|staged| {
            if records::canonical_transaction(&*staged, &tx.tx_id)?.is_some() {
                return Ok(MempoolOutcome::AlreadyMined);
            }
            if records::mempool_transaction(&*staged, &tx.tx_id)?.is_some() {
                return Ok(MempoolOutcome::Duplicate);
            }
            mempool::stage_insert(staged, &tx)?;
            Ok(MempoolOutcome::Added)
        })
    }

    /// Mark a pending transaction dropped. Returns whether it was pending.
    pub fn prune_mempool_transaction(&self, tx_id: &Hash32) -> ChainResult<bool> {
        let _tip = self.tip.lock();
        self.check_halted()?;
        self.write_staged(|staged| mempool::stage_prune(staged, tx_id))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// The current chain tip.
    pub fn chain_tip(&self) -> ChainResult<Option<ChainTip>> {
        let snapshot = self.backend.snapshot();
        records::chain_tip(snapshot.as_ref())
    }

    /// Look up a block by hash (any canonicality) or canonical height.
    pub fn get_block(&self, query: BlockQuery) -> ChainResult<FoundOrNot<Block>> {
        let snapshot = self.backend.snapshot();
        let block = match query {
            BlockQuery::Hash(hash) => records::block_by_hash(snapshot.as_ref(), &hash)?,
            BlockQuery::Height(height) => records::canonical_block_at(snapshot.as_ref(), height)?,
        };
        Ok(block.into())
    }

    /// The block at the chain tip.
    pub fn get_current_block(&self) -> ChainResult<FoundOrNot<Block>> {
        let snapshot = self.backend.snapshot();
        let view = snapshot.as_ref();
        let block = match records::chain_tip(view)? {
            Some(tip) => records::block_by_hash(view, &tip.block_hash)?,
            None => None,
        };
        Ok(block.into())
    }

    /// Transactions of a block, in position order.
    pub fn get_block_transactions(&self, block_hash: &Hash32) -> ChainResult<Vec<Transaction>> {
        let snapshot = self.backend.snapshot();
        records::block_transactions(snapshot.as_ref(), block_hash)
    }

    /// Look up a transaction by id.
    ///
    /// Prefers the canonical instance; otherwise returns the non-canonical
    /// instance from the highest block.
    pub fn get_transaction(&self, tx_id: &Hash32) -> ChainResult<FoundOrNot<Transaction>> {
        let snapshot = self.backend.snapshot();
        let view = snapshot.as_ref();
        if let Some(tx) = records::canonical_transaction(view, tx_id)? {
            return Ok(FoundOrNot::Found(tx));
        }
        let latest = records::transaction_instances(view, tx_id)?
            .into_iter()
            .max_by_key(|tx| tx.block_height);
        Ok(latest.into())
    }

    /// Page through canonical transactions by chain position.
    pub fn get_transactions_page(
        &self,
        limit: usize,
        offset: usize,
        order: Order,
    ) -> ChainResult<Page<Transaction>> {
        let snapshot = self.backend.snapshot();
        let view = snapshot.as_ref();
        let prefix = table_prefix(KeyPrefix::CanonicalTxByPosition);
        let iter = match order {
            Order::Desc => view.prefix_iterator_rev(&prefix)?,
            Order::Asc => view.prefix_iterator(&prefix)?,
        };
        // Key: prefix(1) | height(8) | tx_index(4) | tx_id(32).
        paginate(iter, limit, offset, |key, value| {
            let tx_id = hash_at(key, 13)?;
            let index_hash = hash_at(value, 0)?;
            records::transaction(view, &tx_id, &index_hash)?.ok_or_else(|| {
                ChainError::Corrupt(format!("canonical tx {} has no row", format_hash(&tx_id)))
            })
        })
    }

    /// Page through pending transactions by receipt time.
    pub fn get_mempool_page(
        &self,
        limit: usize,
        offset: usize,
        order: Order,
    ) -> ChainResult<Page<MempoolTransaction>> {
        let snapshot = self.backend.snapshot();
        let view = snapshot.as_ref();
        let prefix = table_prefix(KeyPrefix::MempoolByReceipt);
        let iter = match order {
            Order::Desc => view.prefix_iterator_rev(&prefix)?,
            Order::Asc => view.prefix_iterator(&prefix)?,
        };
        // Key: prefix(1) | receipt_time(8) | tx_id(32).
        paginate(iter, limit, offset, |key, _| {
            let tx_id = hash_at(key, 9)?;
            records::mempool_transaction(view, &tx_id)?.ok_or_else(|| {
                ChainError::Corrupt(format!("pending tx {} has no record", format_hash(&tx_id)))
            })
        })
    }

    /// Look up a mempool record, pruned or not.
    pub fn get_mempool_transaction(
        &self,
        tx_id: &Hash32,
    ) -> ChainResult<FoundOrNot<MempoolTransaction>> {
        let snapshot = self.backend.snapshot();
        Ok(records::mempool_transaction(snapshot.as_ref(), tx_id)?.into())
    }

    /// Look up the canonical deployment of a contract.
    pub fn get_smart_contract(&self, contract_id: &str) -> ChainResult<FoundOrNot<SmartContract>> {
        let snapshot = self.backend.snapshot();
        Ok(records::canonical_contract(snapshot.as_ref(), contract_id)?.into())
    }

    /// Look up a burn block.
    pub fn get_burn_block(&self, hash: &Hash32) -> ChainResult<FoundOrNot<BurnBlock>> {
        let snapshot = self.backend.snapshot();
        Ok(records::burn_block(snapshot.as_ref(), hash)?.into())
    }

    /// Microblocks built on an anchor block, in sequence order.
    pub fn get_microblocks(&self, anchor_index_hash: &Hash32) -> ChainResult<Vec<Microblock>> {
        let snapshot = self.backend.snapshot();
        records::anchored_microblocks(snapshot.as_ref(), anchor_index_hash)
    }

    /// Counters over one snapshot.
    pub fn stats(&self) -> ChainResult<ChainStats> {
        let snapshot = self.backend.snapshot();
        let view = snapshot.as_ref();
        let count = |prefix: KeyPrefix| -> ChainResult<usize> {
            let mut n = 0;
            for item in view.prefix_iterator(&table_prefix(prefix))? {
                item?;
                n += 1;
            }
            Ok(n)
        };
        Ok(ChainStats {
            tip: records::chain_tip(view)?,
            blocks: count(KeyPrefix::BlockByHash)?,
            canonical_blocks: count(KeyPrefix::CanonicalBlockByHeight)?,
            canonical_transactions: count(KeyPrefix::CanonicalTxById)?,
            pending_transactions: count(KeyPrefix::MempoolByReceipt)?,
            halted: self.halted(),
        })
    }
}

fn validate_rows(
    block: &Block,
    transactions: &[Transaction],
    contracts: &[SmartContract],
) -> ChainResult<()> {
    let invalid = |reason: String| ChainError::InvalidBlock {
        hash: block.block_hash,
        reason,
    };
    for tx in transactions {
        if tx.block_hash != block.block_hash
            || tx.index_block_hash != block.index_block_hash
            || tx.block_height != block.block_height
        {
            return Err(invalid(format!(
                "transaction {} belongs to another block",
                format_hash(&tx.tx_id)
            )));
        }
    }
    for contract in contracts {
        if contract.block_hash != block.block_hash {
            return Err(invalid(format!(
                "contract {} belongs to another block",
                contract.contract_id
            )));
        }
        if !transactions.iter().any(|tx| tx.tx_id == contract.tx_id) {
            return Err(invalid(format!(
                "contract {} has no deploying transaction",
                contract.contract_id
            )));
        }
    }
    Ok(())
}

/// Stage a new block's rows, all non-canonical until flipped.
fn stage_new_rows(
    staged: &mut StagedBatch<'_>,
    block: &Block,
    transactions: Vec<Transaction>,
    contracts: Vec<SmartContract>,
    microblocks: Vec<Microblock>,
) -> ChainResult<()> {
    let hash = block.block_hash;
    let mut row = block.clone();
    row.canonical = false;
    records::write(staged, block_by_hash_key(&hash), &row)?;
    staged.put(
        block_hash_by_index_hash_key(&block.index_block_hash),
        hash.to_vec(),
    );
    staged.put(block_by_height_key(block.block_height, &hash), Vec::new());

    for mut tx in transactions {
        tx.canonical = false;
        records::write(staged, tx_key(&tx.tx_id, &tx.index_block_hash), &tx)?;
        records::write(staged, tx_by_block_key(&hash, tx.tx_index), &tx)?;
    }
    for mut contract in contracts {
        contract.canonical = false;
        records::write(
            staged,
            contract_by_block_key(&hash, &contract.contract_id),
            &contract,
        )?;
    }
    for microblock in microblocks {
        stage_microblock(staged, microblock)?;
    }
    Ok(())
}

/// Stage a microblock under its anchor. Its canonical flag follows the
/// anchor block, or is false while the anchor is unknown.
fn stage_microblock(staged: &mut StagedBatch<'_>, mut microblock: Microblock) -> ChainResult<bool> {
    let key = microblock_key(
        &microblock.parent_index_block_hash,
        microblock.microblock_sequence,
        &microblock.microblock_hash,
    );
    if staged.get(&key)?.is_some() {
        return Ok(false);
    }
    microblock.canonical =
        records::block_by_index_hash(&*staged, &microblock.parent_index_block_hash)?
            .map_or(false, |anchor| anchor.canonical);
    records::write(staged, key, &microblock)?;
    Ok(true)
}
