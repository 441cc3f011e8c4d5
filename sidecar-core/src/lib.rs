//! # Sidecar Core
//!
//! Core types, hashing, addresses and serialization for the chain event sidecar.
//!
//! This crate provides the foundation for all other sidecar crates:
//! - Chain record types (blocks, microblocks, transactions, contracts, mempool)
//! - The `FoundOrNot` lookup result shared by every read path
//! - Hash primitives (SHA-256, SHA-512/256, HASH160)
//! - c32check address encoding and public-key address derivation
//! - Decoding of the authorization header of signed transactions
//! - Deterministic binary serialization for storage values

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
pub mod error;
pub mod serialization;
pub mod transaction;
pub mod types;

pub use crypto::{
    address_from_public_key, c32_address, c32_address_decode, hash160, is_valid_c32_address,
    sha256, sha512_256, AddressVersion,
};
pub use error::{AddressError, CoreError, HashError, SerializationError, WireError};
pub use transaction::{decode_auth_header, transaction_id, AuthHeader, HashMode};
pub use types::{
    format_hash, parse_hash, Block, BurnBlock, ChainTip, FoundOrNot, Hash32, MempoolTransaction,
    Microblock, SmartContract, Transaction, TxStatus, TxType,
};
