//! Mempool bookkeeping.
//!
//! A mempool record outlives its pending state: mining or dropping a
//! transaction marks it pruned and removes it from the receipt-time index,
//! and a reorg that orphans the mining block brings it back.

use sidecar_core::{Hash32, MempoolTransaction, Transaction};
use sidecar_storage::keys::{canonical_tx_key, mempool_by_receipt_key, mempool_tx_key};
use sidecar_storage::{KvRead, StagedBatch};

use crate::chain::records;
use crate::error::ChainResult;

/// Stage a new pending record and its receipt-time index row.
pub(crate) fn stage_insert(staged: &mut StagedBatch<'_>, tx: &MempoolTransaction) -> ChainResult<()> {
    records::write(staged, mempool_tx_key(&tx.tx_id), tx)?;
    if !tx.pruned {
        staged.put(mempool_by_receipt_key(tx.receipt_time, &tx.tx_id), Vec::new());
    }
    Ok(())
}

/// Mark a pending record pruned. Returns whether anything changed.
pub(crate) fn stage_prune(staged: &mut StagedBatch<'_>, tx_id: &Hash32) -> ChainResult<bool> {
    let Some(mut record) = records::mempool_transaction(&*staged, tx_id)? else {
        return Ok(false);
    };
    if record.pruned {
        return Ok(false);
    }
    record.pruned = true;
    records::write(staged, mempool_tx_key(tx_id), &record)?;
    staged.delete(mempool_by_receipt_key(record.receipt_time, tx_id));
    Ok(true)
}

/// Return an orphaned transaction to the pending set.
///
/// An existing record is unpruned and keeps its original receipt time.
/// Otherwise a record is rebuilt from the mined row, received at
/// `receipt_time`. Nothing happens while another instance of the id is
/// still canonical.
pub(crate) fn stage_restore(
    staged: &mut StagedBatch<'_>,
    tx: &Transaction,
    receipt_time: u64,
) -> ChainResult<()> {
    if staged.get(&canonical_tx_key(&tx.tx_id))?.is_some() {
        return Ok(());
    }
    let record = match records::mempool_transaction(&*staged, &tx.tx_id)? {
        Some(existing) if !existing.pruned => return Ok(()),
        Some(mut existing) => {
            existing.pruned = false;
            existing
        }
        None => MempoolTransaction::from_orphaned(tx, receipt_time),
    };
    stage_insert(staged, &record)
}
