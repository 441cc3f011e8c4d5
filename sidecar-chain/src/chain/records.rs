//! Typed reads and staged writes over the key schema.
//!
//! Every function takes a `&dyn KvRead` so the same code serves snapshot
//! readers and the ingest path, which reads through its own `StagedBatch`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use sidecar_core::serialization::{deserialize, serialize};
use sidecar_core::{
    Block, BurnBlock, ChainTip, Hash32, MempoolTransaction, Microblock, SmartContract,
    Transaction,
};
use sidecar_storage::keys::{
    block_by_hash_key, block_hash_by_index_hash_key, burn_block_key,
    canonical_block_by_height_key, canonical_contract_key, canonical_tx_key, chain_tip_key,
    contract_by_block_key, contracts_by_block_prefix, hash_at, mempool_tx_key,
    microblocks_by_anchor_prefix, tx_instances_prefix, tx_key, txs_by_block_prefix,
};
use sidecar_storage::{KvRead, StagedBatch};

use crate::error::ChainResult;

pub(crate) fn read<T: DeserializeOwned>(view: &dyn KvRead, key: &[u8]) -> ChainResult<Option<T>> {
    match view.get(key)? {
        Some(bytes) => Ok(Some(deserialize(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn write<T: Serialize>(
    staged: &mut StagedBatch<'_>,
    key: Vec<u8>,
    value: &T,
) -> ChainResult<()> {
    staged.put(key, serialize(value)?);
    Ok(())
}

fn read_hash(view: &dyn KvRead, key: &[u8]) -> ChainResult<Option<Hash32>> {
    match view.get(key)? {
        Some(bytes) => Ok(Some(hash_at(&bytes, 0)?)),
        None => Ok(None),
    }
}

fn read_all<T: DeserializeOwned>(view: &dyn KvRead, prefix: &[u8]) -> ChainResult<Vec<T>> {
    let mut out = Vec::new();
    for item in view.prefix_iterator(prefix)? {
        let (_, value) = item?;
        out.push(deserialize(&value)?);
    }
    Ok(out)
}

pub(crate) fn chain_tip(view: &dyn KvRead) -> ChainResult<Option<ChainTip>> {
    read(view, &chain_tip_key())
}

pub(crate) fn block_by_hash(view: &dyn KvRead, hash: &Hash32) -> ChainResult<Option<Block>> {
    read(view, &block_by_hash_key(hash))
}

pub(crate) fn block_by_index_hash(
    view: &dyn KvRead,
    index_hash: &Hash32,
) -> ChainResult<Option<Block>> {
    match read_hash(view, &block_hash_by_index_hash_key(index_hash))? {
        Some(hash) => block_by_hash(view, &hash),
        None => Ok(None),
    }
}

pub(crate) fn canonical_block_at(view: &dyn KvRead, height: u64) -> ChainResult<Option<Block>> {
    match read_hash(view, &canonical_block_by_height_key(height))? {
        Some(hash) => block_by_hash(view, &hash),
        None => Ok(None),
    }
}

/// Transactions of a block in position order.
pub(crate) fn block_transactions(
    view: &dyn KvRead,
    block_hash: &Hash32,
) -> ChainResult<Vec<Transaction>> {
    read_all(view, &txs_by_block_prefix(block_hash))
}

pub(crate) fn block_contracts(
    view: &dyn KvRead,
    block_hash: &Hash32,
) -> ChainResult<Vec<SmartContract>> {
    read_all(view, &contracts_by_block_prefix(block_hash))
}

/// Microblocks built on an anchor, in sequence order.
pub(crate) fn anchored_microblocks(
    view: &dyn KvRead,
    anchor_index_hash: &Hash32,
) -> ChainResult<Vec<Microblock>> {
    read_all(view, &microblocks_by_anchor_prefix(anchor_index_hash))
}

pub(crate) fn transaction(
    view: &dyn KvRead,
    tx_id: &Hash32,
    index_block_hash: &Hash32,
) -> ChainResult<Option<Transaction>> {
    read(view, &tx_key(tx_id, index_block_hash))
}

pub(crate) fn canonical_transaction(
    view: &dyn KvRead,
    tx_id: &Hash32,
) -> ChainResult<Option<Transaction>> {
    match read_hash(view, &canonical_tx_key(tx_id))? {
        Some(index_hash) => transaction(view, tx_id, &index_hash),
        None => Ok(None),
    }
}

/// Every stored instance of a transaction id, canonical or not.
pub(crate) fn transaction_instances(
    view: &dyn KvRead,
    tx_id: &Hash32,
) -> ChainResult<Vec<Transaction>> {
    read_all(view, &tx_instances_prefix(tx_id))
}

pub(crate) fn canonical_contract(
    view: &dyn KvRead,
    contract_id: &str,
) -> ChainResult<Option<SmartContract>> {
    match read_hash(view, &canonical_contract_key(contract_id))? {
        Some(block_hash) => read(view, &contract_by_block_key(&block_hash, contract_id)),
        None => Ok(None),
    }
}

pub(crate) fn mempool_transaction(
    view: &dyn KvRead,
    tx_id: &Hash32,
) -> ChainResult<Option<MempoolTransaction>> {
    read(view, &mempool_tx_key(tx_id))
}

pub(crate) fn burn_block(view: &dyn KvRead, hash: &Hash32) -> ChainResult<Option<BurnBlock>> {
    read(view, &burn_block_key(hash))
}
