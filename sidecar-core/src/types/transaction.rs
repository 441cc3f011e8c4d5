//! Transaction-level records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::hash::Hash32;

/// Transaction payload kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    /// Native token transfer.
    TokenTransfer,
    /// Smart contract deployment.
    SmartContract,
    /// Smart contract function call.
    ContractCall,
    /// Report of a conflicting microblock pair.
    PoisonMicroblock,
    /// Block reward. Never enters the mempool.
    Coinbase,
}

impl TxType {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::TokenTransfer => "token_transfer",
            TxType::SmartContract => "smart_contract",
            TxType::ContractCall => "contract_call",
            TxType::PoisonMicroblock => "poison_microblock",
            TxType::Coinbase => "coinbase",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token_transfer" => Ok(TxType::TokenTransfer),
            "smart_contract" => Ok(TxType::SmartContract),
            "contract_call" => Ok(TxType::ContractCall),
            "poison_microblock" => Ok(TxType::PoisonMicroblock),
            "coinbase" => Ok(TxType::Coinbase),
            other => Err(format!("unknown transaction type {other:?}")),
        }
    }
}

/// Execution status of a mined transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Not yet mined.
    Pending,
    /// Executed successfully.
    Success,
    /// Aborted by the contract's response.
    AbortByResponse,
    /// Aborted by a failed post-condition.
    AbortByPostCondition,
}

impl TxStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Success => "success",
            TxStatus::AbortByResponse => "abort_by_response",
            TxStatus::AbortByPostCondition => "abort_by_post_condition",
        }
    }
}

/// A transaction mined in a block.
///
/// The same transaction id may be stored once per block that mined it;
/// `(tx_id, index_block_hash)` identifies a row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id.
    pub tx_id: Hash32,
    /// Position within the block.
    pub tx_index: u32,
    /// Hash of the containing block.
    pub block_hash: Hash32,
    /// Index block hash of the containing block.
    pub index_block_hash: Hash32,
    /// Height of the containing block.
    pub block_height: u64,
    /// Burn time of the containing block, in seconds.
    pub burn_block_time: u64,
    /// Payload kind.
    pub tx_type: TxType,
    /// Execution status.
    pub status: TxStatus,
    /// c32check address of the origin account.
    pub sender_address: String,
    /// Fee paid, in micro-units.
    pub fee_rate: u64,
    /// Serialized signed transaction.
    pub raw_tx: Vec<u8>,
    /// Copied from the containing block.
    pub canonical: bool,
}

/// A contract deployed by a `smart_contract` transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartContract {
    /// Fully qualified id, `<deployer address>.<name>`.
    pub contract_id: String,
    /// Deploying transaction.
    pub tx_id: Hash32,
    /// Hash of the containing block.
    pub block_hash: Hash32,
    /// Height of the containing block.
    pub block_height: u64,
    /// Contract source.
    pub source_code: String,
    /// Interface descriptor as JSON text.
    pub abi: String,
    /// Copied from the containing block.
    pub canonical: bool,
}

/// A transaction seen in the node's mempool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolTransaction {
    /// Transaction id.
    pub tx_id: Hash32,
    /// When the sidecar first saw it, in seconds.
    pub receipt_time: u64,
    /// Set once the transaction is mined canonically or dropped.
    pub pruned: bool,
    /// Payload kind.
    pub tx_type: TxType,
    /// c32check address of the origin account.
    pub sender_address: String,
    /// Fee offered, in micro-units.
    pub fee_rate: u64,
    /// Serialized signed transaction.
    pub raw_tx: Vec<u8>,
}

impl MempoolTransaction {
    /// Rebuild the pending view of a transaction that left the canonical chain.
    pub fn from_orphaned(tx: &Transaction, receipt_time: u64) -> Self {
        Self {
            tx_id: tx.tx_id,
            receipt_time,
            pruned: false,
            tx_type: tx.tx_type,
            sender_address: tx.sender_address.clone(),
            fee_rate: tx.fee_rate,
            raw_tx: tx.raw_tx.clone(),
        }
    }
}
