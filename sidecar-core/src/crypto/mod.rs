//! Hashing and address primitives.
//!
//! This module provides:
//! - SHA-256, double SHA-256 and SHA-512/256 digests
//! - HASH160 (RIPEMD-160 over SHA-256) for public-key hashes
//! - c32 (Crockford base-32) encoding and c32check addresses
//! - Address derivation from SEC1-encoded secp256k1 public keys

mod address;
mod c32;
mod hashing;

pub use address::{
    address_from_public_key, c32_address, c32_address_decode, is_valid_c32_address,
    AddressVersion,
};
pub use c32::{c32_decode, c32_encode};
pub use hashing::{hash160, sha256, sha256d, sha512_256};
