//! # Scalar Codec
//!
//! Encode and decode the scalar values the store traffics in: UTF-8 strings
//! and decimal row-key identifiers. The store treats every field as an opaque
//! byte string, so no length delimiting is involved; encode and decode are
//! exact inverses for every supported value.

use bytes::Bytes;

use crate::error::CodecError;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a string value as its UTF-8 bytes.
pub fn encode_str(value: &str) -> Bytes {
    Bytes::copy_from_slice(value.as_bytes())
}

/// Decodes a byte string back into an owned string.
///
/// Fails only when the input is not valid UTF-8.
pub fn decode_str(data: &[u8]) -> CodecResult<String> {
    std::str::from_utf8(data)
        .map(str::to_owned)
        .map_err(|_| CodecError::InvalidUtf8)
}

/// Encodes a decimal row-key identifier, e.g. `6` -> `b"6"`.
pub fn encode_row_id(id: u64) -> Bytes {
    // Digits land in a small stack buffer before the single allocation.
    let mut buf = [0u8; 20];
    let mut len = 0;
    let mut value = id;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
        buf[..len].reverse();
    }
    Bytes::copy_from_slice(&buf[..len])
}

/// Decodes a decimal row-key identifier.
///
/// Strict on canonical form so the round trip is exact: rejects empty input,
/// non-digit bytes, redundant leading zeros, and values over 64 bits.
pub fn decode_row_id(data: &[u8]) -> CodecResult<u64> {
    if data.is_empty() {
        return Err(CodecError::Empty);
    }
    if data.len() > 1 && data[0] == b'0' {
        return Err(CodecError::LeadingZero);
    }

    let mut value: u64 = 0;
    for &b in data {
        if !b.is_ascii_digit() {
            return Err(CodecError::InvalidDigit);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as u64))
            .ok_or(CodecError::Overflow)?;
    }
    Ok(value)
}
