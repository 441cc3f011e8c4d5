//! Chain record types.
//!
//! These are the rows the datastore persists:
//!
//! - Block, Microblock and BurnBlock
//! - Transaction and SmartContract, denormalized with their block position
//! - MempoolTransaction, the pending view of a transaction
//! - ChainTip, the single authoritative tip record
//! - FoundOrNot, the result of every point lookup

mod block;
mod found;
mod hash;
mod transaction;

pub use block::{Block, BurnBlock, ChainTip, Microblock};
pub use found::FoundOrNot;
pub use hash::{format_hash, parse_hash, Hash32};
pub use transaction::{MempoolTransaction, SmartContract, Transaction, TxStatus, TxType};
