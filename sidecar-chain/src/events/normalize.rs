//! Raw payloads to typed ingest operations.

use std::collections::HashSet;

use thiserror::Error;

use sidecar_core::{
    is_valid_c32_address, parse_hash, transaction_id, Block, BurnBlock, Hash32,
    MempoolTransaction, Microblock, SmartContract, Transaction, TxStatus, TxType,
};

use super::raw::{
    RawBlock, RawBurnBlock, RawDroppedTransactions, RawEvent, RawMempoolTransaction,
    RawMicroblock, RawMicroblocks, RawTransaction,
};

/// Reasons a payload is rejected before it reaches the datastore.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("{field}: {reason}")]
    InvalidHash { field: &'static str, reason: String },

    #[error("{field}: invalid hex")]
    InvalidHex { field: &'static str },

    #[error("block names itself as parent")]
    SelfParent,

    #[error("duplicate transaction id {0} in block")]
    DuplicateTxId(String),

    #[error("duplicate transaction index {0} in block")]
    DuplicateTxIndex(u32),

    #[error("unknown transaction type {0:?}")]
    UnknownTxType(String),

    #[error("unknown transaction status {0:?}")]
    UnknownTxStatus(String),

    #[error("contract deploy attached to {tx_type} transaction {txid}")]
    ContractOnNonContractTx { txid: String, tx_type: TxType },

    #[error("malformed contract identifier {0:?}")]
    InvalidContractId(String),

    #[error("duplicate microblock sequence {0}")]
    DuplicateMicroblockSequence(u32),
}

impl From<serde_json::Error> for NormalizeError {
    fn from(err: serde_json::Error) -> Self {
        NormalizeError::Json(err.to_string())
    }
}

/// A block with its dependent rows, ready to ingest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIngest {
    pub block: Block,
    /// Ordered by `tx_index`.
    pub transactions: Vec<Transaction>,
    pub contracts: Vec<SmartContract>,
    pub microblocks: Vec<Microblock>,
}

/// A validated datastore operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOp {
    Block(Box<BlockIngest>),
    BurnBlock(BurnBlock),
    Microblocks(Vec<Microblock>),
    MempoolTransactions(Vec<MempoolTransaction>),
    DropMempoolTransactions(Vec<Hash32>),
}

/// Validate a raw event and convert it.
///
/// `received_at` stands in for the receipt time of mempool transactions
/// that do not carry one.
pub fn normalize(event: RawEvent, received_at: u64) -> Result<IngestOp, NormalizeError> {
    match event {
        RawEvent::NewBlock(raw) => normalize_block(raw).map(|b| IngestOp::Block(Box::new(b))),
        RawEvent::NewBurnBlock(raw) => normalize_burn_block(raw).map(IngestOp::BurnBlock),
        RawEvent::NewMicroblocks(raw) => normalize_microblocks(raw).map(IngestOp::Microblocks),
        RawEvent::NewMempoolTx(raw) => {
            normalize_mempool(raw, received_at).map(IngestOp::MempoolTransactions)
        }
        RawEvent::DropMempoolTx(raw) => {
            normalize_dropped(raw).map(IngestOp::DropMempoolTransactions)
        }
    }
}

fn hash(field: &'static str, value: &str) -> Result<Hash32, NormalizeError> {
    parse_hash(value).map_err(|e| NormalizeError::InvalidHash {
        field,
        reason: e.to_string(),
    })
}

fn raw_bytes(field: &'static str, value: &str) -> Result<Vec<u8>, NormalizeError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|_| NormalizeError::InvalidHex { field })
}

fn tx_type(value: &str) -> Result<TxType, NormalizeError> {
    value
        .parse()
        .map_err(|_| NormalizeError::UnknownTxType(value.to_string()))
}

fn tx_status(value: &str) -> Result<TxStatus, NormalizeError> {
    match value {
        "success" => Ok(TxStatus::Success),
        "abort_by_response" => Ok(TxStatus::AbortByResponse),
        "abort_by_post_condition" => Ok(TxStatus::AbortByPostCondition),
        other => Err(NormalizeError::UnknownTxStatus(other.to_string())),
    }
}

/// `<c32 deployer address>.<contract name>`.
fn check_contract_id(contract_id: &str) -> Result<(), NormalizeError> {
    let invalid = || NormalizeError::InvalidContractId(contract_id.to_string());
    let (address, name) = contract_id.split_once('.').ok_or_else(invalid)?;
    if name.is_empty() || name.contains('.') || !is_valid_c32_address(address) {
        return Err(invalid());
    }
    Ok(())
}

fn normalize_block(raw: RawBlock) -> Result<BlockIngest, NormalizeError> {
    let block = Block {
        block_hash: hash("block_hash", &raw.block_hash)?,
        index_block_hash: hash("index_block_hash", &raw.index_block_hash)?,
        parent_block_hash: hash("parent_block_hash", &raw.parent_block_hash)?,
        parent_index_block_hash: hash("parent_index_block_hash", &raw.parent_index_block_hash)?,
        block_height: raw.block_height,
        burn_block_hash: hash("burn_block_hash", &raw.burn_block_hash)?,
        burn_block_height: raw.burn_block_height,
        burn_block_time: raw.burn_block_time,
        canonical: raw.canonical,
    };
    if block.parent_block_hash == block.block_hash {
        return Err(NormalizeError::SelfParent);
    }

    let mut seen_ids = HashSet::new();
    let mut seen_indexes = HashSet::new();
    let mut transactions = Vec::with_capacity(raw.transactions.len());
    let mut contracts = Vec::new();
    for raw_tx in raw.transactions {
        let (tx, contract) = normalize_block_tx(&block, raw_tx)?;
        if !seen_ids.insert(tx.tx_id) {
            return Err(NormalizeError::DuplicateTxId(format!("0x{}", hex::encode(tx.tx_id))));
        }
        if !seen_indexes.insert(tx.tx_index) {
            return Err(NormalizeError::DuplicateTxIndex(tx.tx_index));
        }
        transactions.push(tx);
        contracts.extend(contract);
    }
    transactions.sort_by_key(|tx| tx.tx_index);

    let microblocks = normalize_microblock_list(raw.microblocks)?;

    Ok(BlockIngest {
        block,
        transactions,
        contracts,
        microblocks,
    })
}

fn normalize_block_tx(
    block: &Block,
    raw: RawTransaction,
) -> Result<(Transaction, Option<SmartContract>), NormalizeError> {
    let tx_id = hash("txid", &raw.txid)?;
    let tx_type = tx_type(&raw.tx_type)?;
    let tx = Transaction {
        tx_id,
        tx_index: raw.tx_index,
        block_hash: block.block_hash,
        index_block_hash: block.index_block_hash,
        block_height: block.block_height,
        burn_block_time: block.burn_block_time,
        tx_type,
        status: tx_status(&raw.status)?,
        sender_address: raw.sender_address,
        fee_rate: raw.fee_rate,
        raw_tx: raw_bytes("raw_tx", &raw.raw_tx)?,
        canonical: block.canonical,
    };

    let contract = match raw.contract_deploy {
        None => None,
        Some(_) if tx_type != TxType::SmartContract => {
            return Err(NormalizeError::ContractOnNonContractTx {
                txid: raw.txid,
                tx_type,
            });
        }
        Some(deploy) => {
            check_contract_id(&deploy.contract_id)?;
            Some(SmartContract {
                contract_id: deploy.contract_id,
                tx_id,
                block_hash: block.block_hash,
                block_height: block.block_height,
                source_code: deploy.source_code,
                abi: deploy.abi.to_string(),
                canonical: block.canonical,
            })
        }
    };
    Ok((tx, contract))
}

fn normalize_microblock_list(raw: Vec<RawMicroblock>) -> Result<Vec<Microblock>, NormalizeError> {
    let mut seen = HashSet::new();
    let mut microblocks = Vec::with_capacity(raw.len());
    for mb in raw {
        let anchor = hash("parent_index_block_hash", &mb.parent_index_block_hash)?;
        if !seen.insert((anchor, mb.microblock_sequence)) {
            return Err(NormalizeError::DuplicateMicroblockSequence(
                mb.microblock_sequence,
            ));
        }
        microblocks.push(Microblock {
            microblock_hash: hash("microblock_hash", &mb.microblock_hash)?,
            microblock_sequence: mb.microblock_sequence,
            microblock_parent_hash: hash("microblock_parent_hash", &mb.microblock_parent_hash)?,
            parent_index_block_hash: anchor,
            canonical: false,
        });
    }
    microblocks.sort_by_key(|mb| (mb.parent_index_block_hash, mb.microblock_sequence));
    Ok(microblocks)
}

fn normalize_burn_block(raw: RawBurnBlock) -> Result<BurnBlock, NormalizeError> {
    Ok(BurnBlock {
        burn_block_hash: hash("burn_block_hash", &raw.burn_block_hash)?,
        burn_block_height: raw.burn_block_height,
        burn_block_time: raw.burn_block_time,
    })
}

fn normalize_microblocks(raw: RawMicroblocks) -> Result<Vec<Microblock>, NormalizeError> {
    normalize_microblock_list(raw.microblocks)
}

fn normalize_mempool(
    raw: Vec<RawMempoolTransaction>,
    received_at: u64,
) -> Result<Vec<MempoolTransaction>, NormalizeError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for tx in raw {
        let raw_tx = raw_bytes("raw_tx", &tx.raw_tx)?;
        let tx_id = match &tx.txid {
            Some(txid) => hash("txid", txid)?,
            None => transaction_id(&raw_tx),
        };
        // Repeats within one delivery collapse to the first.
        if !seen.insert(tx_id) {
            continue;
        }
        out.push(MempoolTransaction {
            tx_id,
            receipt_time: tx.receipt_time.unwrap_or(received_at),
            pruned: false,
            tx_type: tx_type(&tx.tx_type)?,
            sender_address: tx.sender_address,
            fee_rate: tx.fee_rate,
            raw_tx,
        });
    }
    Ok(out)
}

fn normalize_dropped(raw: RawDroppedTransactions) -> Result<Vec<Hash32>, NormalizeError> {
    raw.dropped_txids
        .iter()
        .map(|txid| hash("dropped_txids", txid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::raw::RawContractDeploy;
    use sidecar_core::{c32_address, format_hash, AddressVersion};

    fn h(byte: u8) -> String {
        format_hash(&[byte; 32])
    }

    fn raw_tx(id: u8, index: u32, tx_type: &str) -> RawTransaction {
        RawTransaction {
            txid: h(id),
            tx_index: index,
            tx_type: tx_type.into(),
            status: "success".into(),
            sender_address: "SP000000000000000000002Q6VF78".into(),
            fee_rate: 200,
            raw_tx: "0x00000000010400".into(),
            contract_deploy: None,
        }
    }

    fn raw_block(transactions: Vec<RawTransaction>) -> RawBlock {
        RawBlock {
            block_hash: h(1),
            index_block_hash: h(2),
            parent_block_hash: h(3),
            parent_index_block_hash: h(4),
            block_height: 10,
            burn_block_hash: h(5),
            burn_block_height: 700,
            burn_block_time: 1_700_000_000,
            canonical: true,
            transactions,
            microblocks: vec![],
        }
    }

    fn deploy(contract_id: String) -> Option<RawContractDeploy> {
        Some(RawContractDeploy {
            contract_id,
            source_code: "(define-public (ping) (ok true))".into(),
            abi: serde_json::json!({ "functions": [] }),
        })
    }

    fn deployer() -> String {
        c32_address(AddressVersion::MainnetSingleSig.as_u8(), &[7; 20]).unwrap()
    }

    fn block_op(raw: RawBlock) -> Result<BlockIngest, NormalizeError> {
        match normalize(RawEvent::NewBlock(raw), 0)? {
            IngestOp::Block(block) => Ok(*block),
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_block_transactions_sorted_by_index() {
        let block = block_op(raw_block(vec![
            raw_tx(0x22, 2, "token_transfer"),
            raw_tx(0x20, 0, "coinbase"),
            raw_tx(0x21, 1, "contract_call"),
        ]))
        .unwrap();
        let indexes: Vec<u32> = block.transactions.iter().map(|tx| tx.tx_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(block.transactions[0].tx_type, TxType::Coinbase);
        assert_eq!(block.transactions[2].burn_block_time, 1_700_000_000);
        assert_eq!(block.transactions[0].raw_tx, vec![0, 0, 0, 0, 1, 4, 0]);
    }

    #[test]
    fn test_contract_deploy_extracted() {
        let mut tx = raw_tx(0x30, 0, "smart_contract");
        let id = format!("{}.pinger", deployer());
        tx.contract_deploy = deploy(id.clone());
        let block = block_op(raw_block(vec![tx])).unwrap();
        assert_eq!(block.contracts.len(), 1);
        assert_eq!(block.contracts[0].contract_id, id);
        assert_eq!(block.contracts[0].tx_id, [0x30; 32]);
        assert!(block.contracts[0].abi.contains("functions"));
    }

    #[test]
    fn test_rejects_self_parent() {
        let mut raw = raw_block(vec![]);
        raw.parent_block_hash = raw.block_hash.clone();
        assert_eq!(block_op(raw).unwrap_err(), NormalizeError::SelfParent);
    }

    #[test]
    fn test_rejects_duplicate_ids_and_indexes() {
        let err = block_op(raw_block(vec![
            raw_tx(0x40, 0, "token_transfer"),
            raw_tx(0x40, 1, "token_transfer"),
        ]))
        .unwrap_err();
        assert!(matches!(err, NormalizeError::DuplicateTxId(_)));

        let err = block_op(raw_block(vec![
            raw_tx(0x41, 0, "token_transfer"),
            raw_tx(0x42, 0, "token_transfer"),
        ]))
        .unwrap_err();
        assert_eq!(err, NormalizeError::DuplicateTxIndex(0));
    }

    #[test]
    fn test_rejects_contract_on_transfer() {
        let mut tx = raw_tx(0x50, 0, "token_transfer");
        tx.contract_deploy = deploy(format!("{}.x", deployer()));
        let err = block_op(raw_block(vec![tx])).unwrap_err();
        assert!(matches!(err, NormalizeError::ContractOnNonContractTx { .. }));
    }

    #[test]
    fn test_rejects_malformed_contract_ids() {
        for id in ["no-dot".to_string(), format!("{}.", deployer()), "SPNOTANADDRESS.x".into()] {
            let mut tx = raw_tx(0x51, 0, "smart_contract");
            tx.contract_deploy = deploy(id.clone());
            let err = block_op(raw_block(vec![tx])).unwrap_err();
            assert_eq!(err, NormalizeError::InvalidContractId(id));
        }
    }

    #[test]
    fn test_rejects_bad_hashes_and_hex() {
        let mut raw = raw_block(vec![]);
        raw.block_hash = "0x1234".into();
        assert!(matches!(
            block_op(raw).unwrap_err(),
            NormalizeError::InvalidHash { field: "block_hash", .. }
        ));

        let mut tx = raw_tx(0x60, 0, "token_transfer");
        tx.raw_tx = "0xzz".into();
        assert_eq!(
            block_op(raw_block(vec![tx])).unwrap_err(),
            NormalizeError::InvalidHex { field: "raw_tx" }
        );
    }

    #[test]
    fn test_rejects_unknown_enums() {
        let tx = raw_tx(0x61, 0, "transfer");
        assert!(matches!(
            block_op(raw_block(vec![tx])).unwrap_err(),
            NormalizeError::UnknownTxType(_)
        ));
        let mut tx = raw_tx(0x62, 0, "coinbase");
        tx.status = "pending".into();
        assert!(matches!(
            block_op(raw_block(vec![tx])).unwrap_err(),
            NormalizeError::UnknownTxStatus(_)
        ));
    }

    #[test]
    fn test_rejects_duplicate_microblock_sequence() {
        let mb = |hash_byte: u8| RawMicroblock {
            microblock_hash: h(hash_byte),
            microblock_sequence: 0,
            microblock_parent_hash: h(1),
            parent_index_block_hash: h(2),
        };
        let raw = RawMicroblocks {
            microblocks: vec![mb(0x70), mb(0x71)],
        };
        assert_eq!(
            normalize(RawEvent::NewMicroblocks(raw), 0).unwrap_err(),
            NormalizeError::DuplicateMicroblockSequence(0)
        );
    }

    #[test]
    fn test_mempool_txid_derived_and_receipt_defaulted() {
        let raw = vec![RawMempoolTransaction {
            txid: None,
            raw_tx: "0x0000000001".into(),
            tx_type: "token_transfer".into(),
            sender_address: "SP000000000000000000002Q6VF78".into(),
            fee_rate: 300,
            receipt_time: None,
        }];
        let op = normalize(RawEvent::NewMempoolTx(raw), 1234).unwrap();
        let IngestOp::MempoolTransactions(txs) = op else {
            panic!("unexpected op");
        };
        assert_eq!(txs[0].tx_id, transaction_id(&[0, 0, 0, 0, 1]));
        assert_eq!(txs[0].receipt_time, 1234);
        assert!(!txs[0].pruned);
    }

    #[test]
    fn test_dropped_ids_parsed() {
        let raw = RawDroppedTransactions {
            dropped_txids: vec![h(9), h(10)],
            reason: Some("replace_by_fee".into()),
        };
        assert_eq!(
            normalize(RawEvent::DropMempoolTx(raw), 0).unwrap(),
            IngestOp::DropMempoolTransactions(vec![[9; 32], [10; 32]])
        );

        let raw = RawDroppedTransactions {
            dropped_txids: vec!["9".into()],
            reason: None,
        };
        assert!(normalize(RawEvent::DropMempoolTx(raw), 0).is_err());
    }
}
