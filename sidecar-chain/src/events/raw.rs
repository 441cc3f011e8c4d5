//! Event payloads as the chain node posts them.
//!
//! Hashes and raw transactions arrive as `0x` hex strings and enum values
//! as snake_case names; nothing here is validated yet.

use serde::{Deserialize, Serialize};

fn default_canonical() -> bool {
    true
}

/// `/new_block` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub block_hash: String,
    pub index_block_hash: String,
    pub parent_block_hash: String,
    pub parent_index_block_hash: String,
    pub block_height: u64,
    pub burn_block_hash: String,
    pub burn_block_height: u64,
    pub burn_block_time: u64,
    /// The node's canonicality declaration. Absent means canonical.
    #[serde(default = "default_canonical")]
    pub canonical: bool,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
    /// Microblocks confirmed alongside the block.
    #[serde(default)]
    pub microblocks: Vec<RawMicroblock>,
}

/// A transaction inside a block event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub txid: String,
    pub tx_index: u32,
    pub tx_type: String,
    pub status: String,
    pub sender_address: String,
    #[serde(default)]
    pub fee_rate: u64,
    pub raw_tx: String,
    /// Present only on `smart_contract` transactions.
    #[serde(default)]
    pub contract_deploy: Option<RawContractDeploy>,
}

/// A contract deployed by a block transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawContractDeploy {
    pub contract_id: String,
    pub source_code: String,
    #[serde(default)]
    pub abi: serde_json::Value,
}

/// A microblock header.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawMicroblock {
    pub microblock_hash: String,
    pub microblock_sequence: u32,
    pub microblock_parent_hash: String,
    pub parent_index_block_hash: String,
}

/// `/new_burn_block` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawBurnBlock {
    pub burn_block_hash: String,
    pub burn_block_height: u64,
    pub burn_block_time: u64,
}

/// `/new_microblocks` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawMicroblocks {
    pub microblocks: Vec<RawMicroblock>,
}

/// One entry of the `/new_mempool_tx` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawMempoolTransaction {
    /// Derived from `raw_tx` when absent.
    #[serde(default)]
    pub txid: Option<String>,
    pub raw_tx: String,
    pub tx_type: String,
    pub sender_address: String,
    #[serde(default)]
    pub fee_rate: u64,
    /// Seconds; the sidecar's receive time when absent.
    #[serde(default)]
    pub receipt_time: Option<u64>,
}

/// `/drop_mempool_tx` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDroppedTransactions {
    pub dropped_txids: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Any node event, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum RawEvent {
    NewBlock(RawBlock),
    NewBurnBlock(RawBurnBlock),
    NewMicroblocks(RawMicroblocks),
    NewMempoolTx(Vec<RawMempoolTransaction>),
    DropMempoolTx(RawDroppedTransactions),
}

impl RawEvent {
    /// Event name as used in logs and HTTP paths.
    pub fn kind(&self) -> &'static str {
        match self {
            RawEvent::NewBlock(_) => "new_block",
            RawEvent::NewBurnBlock(_) => "new_burn_block",
            RawEvent::NewMicroblocks(_) => "new_microblocks",
            RawEvent::NewMempoolTx(_) => "new_mempool_tx",
            RawEvent::DropMempoolTx(_) => "drop_mempool_tx",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_event_decodes() {
        let json = r#"{
            "kind": "drop_mempool_tx",
            "payload": { "dropped_txids": ["0xab"] }
        }"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), "drop_mempool_tx");
        match event {
            RawEvent::DropMempoolTx(dropped) => {
                assert_eq!(dropped.dropped_txids, vec!["0xab".to_string()]);
                assert!(dropped.reason.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_block_defaults() {
        let json = r#"{
            "block_hash": "0x01", "index_block_hash": "0x02",
            "parent_block_hash": "0x03", "parent_index_block_hash": "0x04",
            "block_height": 1, "burn_block_hash": "0x05",
            "burn_block_height": 2, "burn_block_time": 3
        }"#;
        let block: RawBlock = serde_json::from_str(json).unwrap();
        assert!(block.canonical);
        assert!(block.transactions.is_empty());
        assert!(block.microblocks.is_empty());
    }
}
