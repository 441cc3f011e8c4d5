//! Key schema encoding for storage.
//!
//! Every table is stored under a one-byte prefix. Composite keys concatenate
//! fixed-width fields; integers are big-endian so prefix scans return rows in
//! chain order.

use crate::error::StorageError;

/// Key prefixes for the stored tables.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyPrefix {
    /// Block by hash: `0x01 || block_hash`
    BlockByHash = 0x01,
    /// Block hash by index block hash: `0x02 || index_block_hash`
    BlockHashByIndexHash = 0x02,
    /// Every stored block at a height, all forks: `0x03 || height || block_hash`
    BlockByHeight = 0x03,
    /// Canonical block hash at a height: `0x04 || height`
    CanonicalBlockByHeight = 0x04,
    /// The chain tip record: `0x05`
    ChainTip = 0x05,
    /// Transaction row: `0x10 || tx_id || index_block_hash`
    TxByKey = 0x10,
    /// Transaction order within a block: `0x11 || block_hash || tx_index`
    TxByBlock = 0x11,
    /// Canonical instance of a transaction id: `0x12 || tx_id`
    CanonicalTxById = 0x12,
    /// Canonical transactions in chain order: `0x13 || height || tx_index || tx_id`
    CanonicalTxByPosition = 0x13,
    /// Contract rows per block: `0x20 || block_hash || contract_id`
    ContractByBlock = 0x20,
    /// Canonical deploying block of a contract: `0x21 || contract_id`
    CanonicalContractById = 0x21,
    /// Microblocks per anchor: `0x30 || anchor_index_hash || sequence || microblock_hash`
    MicroblockByAnchor = 0x30,
    /// Mempool record: `0x40 || tx_id`
    MempoolTx = 0x40,
    /// Pending mempool ids by receipt: `0x41 || receipt_time || tx_id`
    MempoolByReceipt = 0x41,
    /// Burn block by hash: `0x50 || burn_block_hash`
    BurnBlockByHash = 0x50,
}

impl KeyPrefix {
    /// Every prefix in the schema.
    pub const ALL: [KeyPrefix; 15] = [
        KeyPrefix::BlockByHash,
        KeyPrefix::BlockHashByIndexHash,
        KeyPrefix::BlockByHeight,
        KeyPrefix::CanonicalBlockByHeight,
        KeyPrefix::ChainTip,
        KeyPrefix::TxByKey,
        KeyPrefix::TxByBlock,
        KeyPrefix::CanonicalTxById,
        KeyPrefix::CanonicalTxByPosition,
        KeyPrefix::ContractByBlock,
        KeyPrefix::CanonicalContractById,
        KeyPrefix::MicroblockByAnchor,
        KeyPrefix::MempoolTx,
        KeyPrefix::MempoolByReceipt,
        KeyPrefix::BurnBlockByHash,
    ];
}

/// The bare prefix of a table, for full-table scans.
pub fn table_prefix(prefix: KeyPrefix) -> Vec<u8> {
    vec![prefix as u8]
}

fn key(prefix: KeyPrefix, capacity: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + capacity);
    key.push(prefix as u8);
    key
}

/// Create a block-by-hash key.
pub fn block_by_hash_key(hash: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::BlockByHash, 32);
    k.extend_from_slice(hash);
    k
}

/// Create a block-hash-by-index-hash key.
pub fn block_hash_by_index_hash_key(index_hash: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::BlockHashByIndexHash, 32);
    k.extend_from_slice(index_hash);
    k
}

/// Prefix of all blocks stored at a height.
pub fn blocks_at_height_prefix(height: u64) -> Vec<u8> {
    let mut k = key(KeyPrefix::BlockByHeight, 40);
    k.extend_from_slice(&height.to_be_bytes());
    k
}

/// Create a block-by-height key.
pub fn block_by_height_key(height: u64, hash: &[u8; 32]) -> Vec<u8> {
    let mut k = blocks_at_height_prefix(height);
    k.extend_from_slice(hash);
    k
}

/// Create a canonical-block-by-height key.
pub fn canonical_block_by_height_key(height: u64) -> Vec<u8> {
    let mut k = key(KeyPrefix::CanonicalBlockByHeight, 8);
    k.extend_from_slice(&height.to_be_bytes());
    k
}

/// The chain tip key.
pub fn chain_tip_key() -> Vec<u8> {
    table_prefix(KeyPrefix::ChainTip)
}

/// Prefix of every stored instance of a transaction id.
pub fn tx_instances_prefix(tx_id: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::TxByKey, 64);
    k.extend_from_slice(tx_id);
    k
}

/// Create a transaction row key.
pub fn tx_key(tx_id: &[u8; 32], index_block_hash: &[u8; 32]) -> Vec<u8> {
    let mut k = tx_instances_prefix(tx_id);
    k.extend_from_slice(index_block_hash);
    k
}

/// Prefix of the transactions of one block.
pub fn txs_by_block_prefix(block_hash: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::TxByBlock, 36);
    k.extend_from_slice(block_hash);
    k
}

/// Create a transaction-by-block key.
pub fn tx_by_block_key(block_hash: &[u8; 32], tx_index: u32) -> Vec<u8> {
    let mut k = txs_by_block_prefix(block_hash);
    k.extend_from_slice(&tx_index.to_be_bytes());
    k
}

/// Create a canonical-transaction-by-id key.
pub fn canonical_tx_key(tx_id: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::CanonicalTxById, 32);
    k.extend_from_slice(tx_id);
    k
}

/// Create a canonical-transaction-by-position key.
pub fn canonical_tx_position_key(height: u64, tx_index: u32, tx_id: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::CanonicalTxByPosition, 44);
    k.extend_from_slice(&height.to_be_bytes());
    k.extend_from_slice(&tx_index.to_be_bytes());
    k.extend_from_slice(tx_id);
    k
}

/// Prefix of the contracts deployed in one block.
pub fn contracts_by_block_prefix(block_hash: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::ContractByBlock, 32);
    k.extend_from_slice(block_hash);
    k
}

/// Create a contract-by-block key.
pub fn contract_by_block_key(block_hash: &[u8; 32], contract_id: &str) -> Vec<u8> {
    let mut k = contracts_by_block_prefix(block_hash);
    k.extend_from_slice(contract_id.as_bytes());
    k
}

/// Create a canonical-contract key.
pub fn canonical_contract_key(contract_id: &str) -> Vec<u8> {
    let mut k = key(KeyPrefix::CanonicalContractById, contract_id.len());
    k.extend_from_slice(contract_id.as_bytes());
    k
}

/// Prefix of the microblocks built on one anchor.
pub fn microblocks_by_anchor_prefix(anchor_index_hash: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::MicroblockByAnchor, 68);
    k.extend_from_slice(anchor_index_hash);
    k
}

/// Create a microblock key.
pub fn microblock_key(anchor_index_hash: &[u8; 32], sequence: u32, hash: &[u8; 32]) -> Vec<u8> {
    let mut k = microblocks_by_anchor_prefix(anchor_index_hash);
    k.extend_from_slice(&sequence.to_be_bytes());
    k.extend_from_slice(hash);
    k
}

/// Create a mempool record key.
pub fn mempool_tx_key(tx_id: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::MempoolTx, 32);
    k.extend_from_slice(tx_id);
    k
}

/// Create a pending-by-receipt key.
pub fn mempool_by_receipt_key(receipt_time: u64, tx_id: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::MempoolByReceipt, 40);
    k.extend_from_slice(&receipt_time.to_be_bytes());
    k.extend_from_slice(tx_id);
    k
}

/// Create a burn-block key.
pub fn burn_block_key(hash: &[u8; 32]) -> Vec<u8> {
    let mut k = key(KeyPrefix::BurnBlockByHash, 32);
    k.extend_from_slice(hash);
    k
}

/// Read a 32-byte hash out of a key or value slice.
pub fn hash_at(bytes: &[u8], offset: usize) -> Result<[u8; 32], StorageError> {
    let end = offset + 32;
    if bytes.len() < end {
        return Err(StorageError::InvalidKey(format!(
            "expected 32 bytes at offset {}, have {}",
            offset,
            bytes.len()
        )));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[offset..end]);
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefixes_unique() {
        let values: Vec<u8> = KeyPrefix::ALL.iter().map(|p| *p as u8).collect();
        let unique: std::collections::HashSet<u8> = values.iter().copied().collect();
        assert_eq!(values.len(), unique.len(), "Duplicate prefix values found");
    }

    #[test]
    fn test_block_keys() {
        let hash = [5u8; 32];
        let key = block_by_hash_key(&hash);
        assert_eq!(key[0], KeyPrefix::BlockByHash as u8);
        assert_eq!(&key[1..], &hash);

        let key = canonical_block_by_height_key(12345);
        assert_eq!(key[0], KeyPrefix::CanonicalBlockByHeight as u8);
        assert_eq!(&key[1..], &12345u64.to_be_bytes());

        let key = block_by_height_key(7, &hash);
        assert!(key.starts_with(&blocks_at_height_prefix(7)));
        assert_eq!(hash_at(&key, 9).unwrap(), hash);
    }

    #[test]
    fn test_position_keys_sort_in_chain_order() {
        let id = [0xffu8; 32];
        let low = canonical_tx_position_key(9, 300, &id);
        let high = canonical_tx_position_key(10, 0, &[0u8; 32]);
        assert!(low < high);

        let first = canonical_tx_position_key(10, 1, &id);
        let second = canonical_tx_position_key(10, 2, &[0u8; 32]);
        assert!(first < second);
    }

    #[test]
    fn test_tx_key_layout() {
        let tx_id = [1u8; 32];
        let index = [2u8; 32];
        let key = tx_key(&tx_id, &index);
        assert!(key.starts_with(&tx_instances_prefix(&tx_id)));
        assert_eq!(hash_at(&key, 1).unwrap(), tx_id);
        assert_eq!(hash_at(&key, 33).unwrap(), index);
    }

    #[test]
    fn test_receipt_keys_sort_by_time() {
        let a = mempool_by_receipt_key(5, &[0xffu8; 32]);
        let b = mempool_by_receipt_key(6, &[0u8; 32]);
        assert!(a < b);
    }

    #[test]
    fn test_hash_at_short_input() {
        assert!(hash_at(&[0u8; 10], 0).is_err());
    }
}
