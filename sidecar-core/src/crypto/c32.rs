//! Crockford base-32 ("c32") encoding.
//!
//! Bytes are consumed from the least significant end, five bits per output
//! symbol. Leading zero bytes of the input are preserved as leading `0`
//! symbols so the encoding round-trips exactly.

use crate::error::AddressError;

/// The c32 alphabet. Omits I, L, O and U.
pub(crate) const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Map one input character to its 5-bit value.
///
/// Lower-case letters are accepted, and the easily confused `O`, `L` and `I`
/// are read as `0` and `1`.
pub(crate) fn c32_digit(c: char) -> Result<u8, AddressError> {
    let upper = c.to_ascii_uppercase();
    let normalized = match upper {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|&a| a as char == normalized)
        .map(|p| p as u8)
        .ok_or(AddressError::InvalidCharacter(c))
}

/// Encode bytes as a c32 string.
pub fn c32_encode(input: &[u8]) -> String {
    let mut symbols: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u8 = 0;
    let mut carry_bits: u8 = 0;

    for &byte in input.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = byte & ((1u8 << low_bits_to_take) - 1);
        symbols.push(C32_ALPHABET[((low_bits << carry_bits) + carry) as usize]);
        carry_bits = 8 + carry_bits - 5;
        carry = byte >> (8 - carry_bits);

        if carry_bits >= 5 {
            symbols.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        symbols.push(C32_ALPHABET[carry as usize]);
    }

    // Drop high-order zero symbols produced by the bit packing.
    while symbols.last() == Some(&C32_ALPHABET[0]) {
        symbols.pop();
    }

    for &byte in input {
        if byte != 0 {
            break;
        }
        symbols.push(C32_ALPHABET[0]);
    }

    symbols.reverse();
    symbols.into_iter().map(char::from).collect()
}

/// Decode a c32 string into bytes.
pub fn c32_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    if !input.is_ascii() {
        return Err(AddressError::InvalidFormat);
    }

    let digits = input
        .chars()
        .rev()
        .map(c32_digit)
        .collect::<Result<Vec<u8>, _>>()?;

    let mut bytes: Vec<u8> = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;

    for &digit in &digits {
        carry += (digit as u16) << carry_bits;
        carry_bits += 5;

        if carry_bits >= 8 {
            bytes.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }

    if carry_bits > 0 {
        bytes.push(carry as u8);
    }

    while bytes.last() == Some(&0) {
        bytes.pop();
    }

    for &digit in digits.iter().rev() {
        if digit != 0 {
            break;
        }
        bytes.push(0);
    }

    bytes.reverse();
    Ok(bytes)
}
