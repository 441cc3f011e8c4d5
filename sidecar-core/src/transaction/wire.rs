//! Authorization header decoding.

use crate::crypto::sha512_256;
use crate::error::WireError;
use crate::types::Hash32;

const AUTH_STANDARD: u8 = 0x04;
const AUTH_SPONSORED: u8 = 0x05;

/// Network a transaction was serialized for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionVersion {
    /// Version byte `0x00`.
    Mainnet,
    /// Version byte `0x80`.
    Testnet,
}

/// Spending-condition hash modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashMode {
    /// Pay-to-public-key-hash (`0x00`).
    P2pkh,
    /// Pay-to-witness-public-key-hash (`0x02`).
    P2wpkh,
}

/// Decoded origin authorization of a single-signature standard transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthHeader {
    /// Network version.
    pub version: TransactionVersion,
    /// Chain id.
    pub chain_id: u32,
    /// Single-sig hash mode.
    pub hash_mode: HashMode,
    /// HASH160 of the signer's public key.
    pub signer: [u8; 20],
    /// Origin account nonce.
    pub nonce: u64,
    /// Fee, in micro-units.
    pub fee: u64,
    /// Public key encoding byte, `0x00` compressed or `0x01` uncompressed.
    pub key_encoding: u8,
    /// Recoverable signature.
    pub signature: [u8; 65],
}

impl AuthHeader {
    /// An all-zero signature marks a transaction that was never signed.
    pub fn is_signed(&self) -> bool {
        self.signature.iter().any(|&b| b != 0)
    }
}

/// Transaction id: SHA-512/256 of the serialized transaction.
pub fn transaction_id(raw: &[u8]) -> Hash32 {
    sha512_256(raw)
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], WireError> {
        if self.bytes.len() < n {
            return Err(WireError::UnexpectedEof(field));
        }
        let (head, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        Ok(head)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, WireError> {
        Ok(self.take(1, field)?[0])
    }

    fn u32_be(&mut self, field: &'static str) -> Result<u32, WireError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, field)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn u64_be(&mut self, field: &'static str) -> Result<u64, WireError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, field)?);
        Ok(u64::from_be_bytes(buf))
    }
}

/// Decode the header of a serialized signed transaction.
///
/// Sponsored authorization and multi-signature spending conditions are
/// rejected. The anchor and post-condition mode bytes that follow the
/// authorization are checked so a truncated header is not mistaken for a
/// valid one.
pub fn decode_auth_header(raw: &[u8]) -> Result<AuthHeader, WireError> {
    let mut r = Reader { bytes: raw };

    let version = match r.u8("version")? {
        0x00 => TransactionVersion::Mainnet,
        0x80 => TransactionVersion::Testnet,
        other => return Err(WireError::UnknownVersion(other)),
    };
    let chain_id = r.u32_be("chain_id")?;

    match r.u8("auth_type")? {
        AUTH_STANDARD => {}
        AUTH_SPONSORED => return Err(WireError::SponsoredAuth),
        other => return Err(WireError::UnknownAuthType(other)),
    }

    let hash_mode = match r.u8("hash_mode")? {
        0x00 => HashMode::P2pkh,
        0x02 => HashMode::P2wpkh,
        0x01 | 0x03 => return Err(WireError::MultisigAuth),
        other => return Err(WireError::UnknownHashMode(other)),
    };

    let mut signer = [0u8; 20];
    signer.copy_from_slice(r.take(20, "signer")?);
    let nonce = r.u64_be("nonce")?;
    let fee = r.u64_be("fee")?;

    let key_encoding = r.u8("key_encoding")?;
    if key_encoding > 0x01 {
        return Err(WireError::UnknownKeyEncoding(key_encoding));
    }

    let mut signature = [0u8; 65];
    signature.copy_from_slice(r.take(65, "signature")?);

    match r.u8("anchor_mode")? {
        0x01..=0x03 => {}
        other => return Err(WireError::UnknownAnchorMode(other)),
    }
    match r.u8("post_condition_mode")? {
        0x01 | 0x02 => {}
        other => return Err(WireError::UnknownPostConditionMode(other)),
    }

    Ok(AuthHeader {
        version,
        chain_id,
        hash_mode,
        signer,
        nonce,
        fee,
        key_encoding,
        signature,
    })
}
