//! c32check addresses.
//!
//! An address is `S`, one c32 symbol for the 5-bit version, then the c32
//! encoding of `hash160 || checksum` where the checksum is the first four
//! bytes of `sha256d(version || hash160)`.

use serde::{Deserialize, Serialize};

use super::c32::{c32_decode, c32_digit, c32_encode, C32_ALPHABET};
use super::hashing::{hash160, sha256d};
use crate::error::AddressError;

/// Single-sig address versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressVersion {
    /// Mainnet pay-to-public-key-hash (`SP...`).
    MainnetSingleSig,
    /// Testnet pay-to-public-key-hash (`ST...`).
    TestnetSingleSig,
}

impl AddressVersion {
    /// The 5-bit version number.
    pub fn as_u8(self) -> u8 {
        match self {
            AddressVersion::MainnetSingleSig => 22,
            AddressVersion::TestnetSingleSig => 26,
        }
    }
}

/// Encode a versioned 20-byte hash as a c32check address.
pub fn c32_address(version: u8, hash: &[u8; 20]) -> Result<String, AddressError> {
    if version >= 32 {
        return Err(AddressError::InvalidVersion(version));
    }

    let mut check_input = Vec::with_capacity(21);
    check_input.push(version);
    check_input.extend_from_slice(hash);
    let checksum = sha256d(&check_input);

    let mut payload = hash.to_vec();
    payload.extend_from_slice(&checksum[..4]);

    Ok(format!(
        "S{}{}",
        C32_ALPHABET[version as usize] as char,
        c32_encode(&payload)
    ))
}

/// Decode a c32check address into its version and 20-byte hash.
pub fn c32_address_decode(address: &str) -> Result<(u8, [u8; 20]), AddressError> {
    let body = address.strip_prefix('S').ok_or(AddressError::InvalidFormat)?;
    let mut chars = body.chars();
    let version = c32_digit(chars.next().ok_or(AddressError::InvalidFormat)?)?;

    let decoded = c32_decode(chars.as_str())?;
    if decoded.len() != 24 {
        return Err(AddressError::InvalidFormat);
    }
    let (data, checksum) = decoded.split_at(20);

    let mut check_input = Vec::with_capacity(21);
    check_input.push(version);
    check_input.extend_from_slice(data);
    if &sha256d(&check_input)[..4] != checksum {
        return Err(AddressError::ChecksumMismatch);
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(data);
    Ok((version, hash))
}

/// Whether `address` decodes as a well-formed c32check address.
pub fn is_valid_c32_address(address: &str) -> bool {
    c32_address_decode(address).is_ok()
}

/// Derive the single-sig address of a SEC1-encoded secp256k1 public key.
///
/// Accepts 33-byte compressed keys (`02`/`03` prefix) and 65-byte
/// uncompressed keys (`04` prefix). The key is hashed as given; compressed
/// and uncompressed forms of one key yield different addresses.
pub fn address_from_public_key(
    public_key: &[u8],
    version: AddressVersion,
) -> Result<String, AddressError> {
    let well_formed = matches!(
        (public_key.len(), public_key.first()),
        (33, Some(0x02)) | (33, Some(0x03)) | (65, Some(0x04))
    );
    if !well_formed {
        return Err(AddressError::InvalidPublicKey);
    }
    c32_address(version.as_u8(), &hash160(public_key))
}
