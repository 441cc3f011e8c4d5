//! 32-byte hashes and their `0x` hex rendering.

use crate::error::HashError;

/// A 32-byte block, transaction or microblock hash.
pub type Hash32 = [u8; 32];

/// Parse a `0x`-prefixed, 64-digit hex hash.
pub fn parse_hash(s: &str) -> Result<Hash32, HashError> {
    let digits = s.strip_prefix("0x").ok_or(HashError::MissingPrefix)?;
    let bytes = hex::decode(digits).map_err(|_| HashError::InvalidHex)?;
    if bytes.len() != 32 {
        return Err(HashError::InvalidLength(bytes.len()));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Render a hash as `0x` followed by lowercase hex.
pub fn format_hash(hash: &Hash32) -> String {
    format!("0x{}", hex::encode(hash))
}
