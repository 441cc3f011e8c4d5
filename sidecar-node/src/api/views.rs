//! JSON shapes returned by the public API.
//!
//! Hashes and raw transactions render as `0x` hex; amounts render as
//! decimal strings.

use serde::{Deserialize, Serialize};

use sidecar_chain::{ChainStats, PageRequest};
use sidecar_core::{
    format_hash, Block, ChainTip, MempoolTransaction, SmartContract, Transaction,
};

fn hex_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// A page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListView<T> {
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
    pub results: Vec<T>,
}

impl<T> ListView<T> {
    pub fn new(request: PageRequest, total: usize, results: Vec<T>) -> Self {
        Self {
            limit: request.limit,
            offset: request.offset,
            total,
            results,
        }
    }
}

/// Block information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockView {
    pub canonical: bool,
    pub height: u64,
    pub hash: String,
    pub index_block_hash: String,
    pub parent_block_hash: String,
    pub parent_index_block_hash: String,
    pub burn_block_hash: String,
    pub burn_block_height: u64,
    pub burn_block_time: u64,
    pub txs: Vec<String>,
}

impl BlockView {
    pub fn new(block: &Block, txs: &[Transaction]) -> Self {
        Self {
            canonical: block.canonical,
            height: block.block_height,
            hash: format_hash(&block.block_hash),
            index_block_hash: format_hash(&block.index_block_hash),
            parent_block_hash: format_hash(&block.parent_block_hash),
            parent_index_block_hash: format_hash(&block.parent_index_block_hash),
            burn_block_hash: format_hash(&block.burn_block_hash),
            burn_block_height: block.burn_block_height,
            burn_block_time: block.burn_block_time,
            txs: txs.iter().map(|tx| format_hash(&tx.tx_id)).collect(),
        }
    }
}

/// A mined transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    pub tx_id: String,
    pub tx_type: String,
    pub tx_status: String,
    pub tx_index: u32,
    pub sender_address: String,
    pub fee_rate: String,
    pub block_hash: String,
    pub index_block_hash: String,
    pub block_height: u64,
    pub burn_block_time: u64,
    pub canonical: bool,
    pub raw_tx: String,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        Self {
            tx_id: format_hash(&tx.tx_id),
            tx_type: tx.tx_type.as_str().to_string(),
            tx_status: tx.status.as_str().to_string(),
            tx_index: tx.tx_index,
            sender_address: tx.sender_address.clone(),
            fee_rate: tx.fee_rate.to_string(),
            block_hash: format_hash(&tx.block_hash),
            index_block_hash: format_hash(&tx.index_block_hash),
            block_height: tx.block_height,
            burn_block_time: tx.burn_block_time,
            canonical: tx.canonical,
            raw_tx: hex_bytes(&tx.raw_tx),
        }
    }
}

/// A transaction waiting in the mempool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolTransactionView {
    pub tx_id: String,
    pub tx_type: String,
    pub tx_status: String,
    pub sender_address: String,
    pub fee_rate: String,
    pub receipt_time: u64,
    pub raw_tx: String,
}

impl From<&MempoolTransaction> for MempoolTransactionView {
    fn from(tx: &MempoolTransaction) -> Self {
        Self {
            tx_id: format_hash(&tx.tx_id),
            tx_type: tx.tx_type.as_str().to_string(),
            tx_status: "pending".to_string(),
            sender_address: tx.sender_address.clone(),
            fee_rate: tx.fee_rate.to_string(),
            receipt_time: tx.receipt_time,
            raw_tx: hex_bytes(&tx.raw_tx),
        }
    }
}

/// Result of a lookup by transaction id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionLookupView {
    Mined(TransactionView),
    Pending(MempoolTransactionView),
}

/// A deployed contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractView {
    pub contract_id: String,
    pub tx_id: String,
    pub block_hash: String,
    pub block_height: u64,
    pub canonical: bool,
    pub source_code: String,
    pub abi: serde_json::Value,
}

impl From<&SmartContract> for ContractView {
    fn from(contract: &SmartContract) -> Self {
        // Stored ABIs are JSON text; anything else is passed through as a string.
        let abi = serde_json::from_str(&contract.abi)
            .unwrap_or_else(|_| serde_json::Value::String(contract.abi.clone()));
        Self {
            contract_id: contract.contract_id.clone(),
            tx_id: format_hash(&contract.tx_id),
            block_hash: format_hash(&contract.block_hash),
            block_height: contract.block_height,
            canonical: contract.canonical,
            source_code: contract.source_code.clone(),
            abi,
        }
    }
}

/// Chain tip summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipView {
    pub block_height: u64,
    pub block_hash: String,
    pub index_block_hash: String,
}

impl From<&ChainTip> for TipView {
    fn from(tip: &ChainTip) -> Self {
        Self {
            block_height: tip.block_height,
            block_hash: format_hash(&tip.block_hash),
            index_block_hash: format_hash(&tip.index_block_hash),
        }
    }
}

/// `/extended/v1/status` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusView {
    /// `ready`, or `halted` once ingest has latched.
    pub status: String,
    pub server_version: String,
    pub chain_tip: Option<TipView>,
    pub blocks: usize,
    pub canonical_blocks: usize,
    pub canonical_transactions: usize,
    pub pending_transactions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_reason: Option<String>,
}

impl From<&ChainStats> for StatusView {
    fn from(stats: &ChainStats) -> Self {
        let status = if stats.halted.is_some() { "halted" } else { "ready" };
        Self {
            status: status.to_string(),
            server_version: format!("sidecar-node v{}", env!("CARGO_PKG_VERSION")),
            chain_tip: stats.tip.as_ref().map(TipView::from),
            blocks: stats.blocks,
            canonical_blocks: stats.canonical_blocks,
            canonical_transactions: stats.canonical_transactions,
            pending_transactions: stats.pending_transactions,
            halted_reason: stats.halted.clone(),
        }
    }
}
