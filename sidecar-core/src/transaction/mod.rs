//! Signed transaction wire decoding.
//!
//! Only the version, chain id and authorization header are decoded. The
//! payload is never interpreted; the transaction id covers the whole
//! serialized transaction regardless.

mod wire;

pub use wire::{decode_auth_header, transaction_id, AuthHeader, HashMode, TransactionVersion};
