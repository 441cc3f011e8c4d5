//! Error types for the sidecar core crate.

use std::fmt;

/// Top-level error type for sidecar-core operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Serialization or deserialization failed.
    Serialization(SerializationError),
    /// A hex-encoded hash could not be parsed.
    Hash(HashError),
    /// A c32check address could not be encoded or decoded.
    Address(AddressError),
    /// A signed transaction could not be decoded.
    Wire(WireError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Serialization(e) => write!(f, "serialization error: {}", e),
            CoreError::Hash(e) => write!(f, "hash error: {}", e),
            CoreError::Address(e) => write!(f, "address error: {}", e),
            CoreError::Wire(e) => write!(f, "transaction decode error: {}", e),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<SerializationError> for CoreError {
    fn from(e: SerializationError) -> Self {
        CoreError::Serialization(e)
    }
}

impl From<HashError> for CoreError {
    fn from(e: HashError) -> Self {
        CoreError::Hash(e)
    }
}

impl From<AddressError> for CoreError {
    fn from(e: AddressError) -> Self {
        CoreError::Address(e)
    }
}

impl From<WireError> for CoreError {
    fn from(e: WireError) -> Self {
        CoreError::Wire(e)
    }
}

/// Errors related to serialization and deserialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to encode data to bytes.
    EncodeFailed(String),
    /// Failed to decode data from bytes.
    DecodeFailed(String),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::EncodeFailed(msg) => write!(f, "encode failed: {}", msg),
            SerializationError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
        }
    }
}

impl std::error::Error for SerializationError {}

/// Errors parsing `0x`-prefixed 32-byte hashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HashError {
    /// The `0x` prefix is missing.
    MissingPrefix,
    /// The string contains non-hex characters.
    InvalidHex,
    /// The decoded value is not 32 bytes.
    InvalidLength(usize),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashError::MissingPrefix => write!(f, "hash must start with 0x"),
            HashError::InvalidHex => write!(f, "hash is not valid hex"),
            HashError::InvalidLength(len) => write!(f, "hash must be 32 bytes, got {}", len),
        }
    }
}

impl std::error::Error for HashError {}

/// Errors related to c32 and c32check address handling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressError {
    /// Character outside the c32 alphabet.
    InvalidCharacter(char),
    /// Address version does not fit in 5 bits.
    InvalidVersion(u8),
    /// Address is too short or missing the `S` prefix.
    InvalidFormat,
    /// Trailing checksum did not match.
    ChecksumMismatch,
    /// Public key bytes are not a SEC1 secp256k1 key.
    InvalidPublicKey,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidCharacter(c) => write!(f, "invalid c32 character {:?}", c),
            AddressError::InvalidVersion(v) => write!(f, "invalid address version {}", v),
            AddressError::InvalidFormat => write!(f, "malformed c32check address"),
            AddressError::ChecksumMismatch => write!(f, "c32check checksum mismatch"),
            AddressError::InvalidPublicKey => write!(f, "invalid secp256k1 public key encoding"),
        }
    }
}

impl std::error::Error for AddressError {}

/// Errors decoding a serialized signed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before the named field.
    UnexpectedEof(&'static str),
    /// Unknown transaction version byte.
    UnknownVersion(u8),
    /// Unknown authorization type byte.
    UnknownAuthType(u8),
    /// Sponsored authorization is not supported.
    SponsoredAuth,
    /// Unknown spending-condition hash mode.
    UnknownHashMode(u8),
    /// Multi-signature spending conditions are not supported.
    MultisigAuth,
    /// Unknown public key encoding byte.
    UnknownKeyEncoding(u8),
    /// Unknown anchor mode byte.
    UnknownAnchorMode(u8),
    /// Unknown post-condition mode byte.
    UnknownPostConditionMode(u8),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::UnexpectedEof(field) => write!(f, "unexpected end of input reading {}", field),
            WireError::UnknownVersion(b) => write!(f, "unknown transaction version 0x{:02x}", b),
            WireError::UnknownAuthType(b) => write!(f, "unknown authorization type 0x{:02x}", b),
            WireError::SponsoredAuth => write!(f, "sponsored authorization is not supported"),
            WireError::UnknownHashMode(b) => write!(f, "unknown hash mode 0x{:02x}", b),
            WireError::MultisigAuth => write!(f, "multi-signature authorization is not supported"),
            WireError::UnknownKeyEncoding(b) => write!(f, "unknown key encoding 0x{:02x}", b),
            WireError::UnknownAnchorMode(b) => write!(f, "unknown anchor mode 0x{:02x}", b),
            WireError::UnknownPostConditionMode(b) => {
                write!(f, "unknown post-condition mode 0x{:02x}", b)
            }
        }
    }
}

impl std::error::Error for WireError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = CoreError::Serialization(SerializationError::EncodeFailed("test".into()));
        assert!(e.to_string().contains("encode failed"));

        let e = CoreError::Hash(HashError::InvalidLength(31));
        assert!(e.to_string().contains("31"));

        let e = CoreError::Wire(WireError::UnexpectedEof("signature"));
        assert!(e.to_string().contains("signature"));
    }

    #[test]
    fn test_error_conversion() {
        let core_err: CoreError = AddressError::ChecksumMismatch.into();
        assert!(matches!(core_err, CoreError::Address(AddressError::ChecksumMismatch)));
    }
}
