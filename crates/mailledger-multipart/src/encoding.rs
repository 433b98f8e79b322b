//! Content-Transfer-Encoding decoding.
//!
//! Supports Base64 and Quoted-Printable; the identity encodings pass the
//! payload through unchanged.

use crate::entity::TransferEncoding;
use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, general_purpose};

/// Base64 engine that tolerates missing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes a payload according to its transfer encoding.
///
/// # Errors
///
/// Returns an error if the payload is not valid for `encoding`.
pub fn decode(encoding: TransferEncoding, data: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(data),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(data),
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            Ok(data.to_vec())
        }
    }
}

/// Decodes Base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045 §6.7).
///
/// Trailing whitespace on each line is dropped as transport padding, and
/// `=` at the end of a line is a soft line break.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());

    for line in data.split_inclusive(|&b| b == b'\n') {
        let (content, line_break) = match line {
            [rest @ .., b'\r', b'\n'] => (rest, &b"\r\n"[..]),
            [rest @ .., b'\n'] => (rest, &b"\n"[..]),
            _ => (line, &b""[..]),
        };
        let content = trim_end_whitespace(content);

        let (content, soft_break) = match content {
            [rest @ .., b'='] => (rest, true),
            _ => (content, false),
        };

        let mut bytes = content.iter().copied();
        while let Some(byte) = bytes.next() {
            if byte != b'=' {
                result.push(byte);
                continue;
            }
            // Hex encoded byte
            match (bytes.next(), bytes.next()) {
                (Some(high), Some(low)) => result.push(hex_pair(high, low)?),
                _ => {
                    return Err(Error::InvalidEncoding(
                        "Incomplete escape sequence".to_string(),
                    ));
                }
            }
        }

        if !soft_break {
            result.extend_from_slice(line_break);
        }
    }

    Ok(result)
}

fn trim_end_whitespace(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

fn hex_pair(high: u8, low: u8) -> Result<u8> {
    let digit = |b: u8| {
        char::from(b)
            .to_digit(16)
            .ok_or_else(|| Error::InvalidEncoding(format!("Invalid hex digit: {b:#04x}")))
    };
    let value = digit(high)? * 16 + digit(low)?;
    u8::try_from(value).map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))
}
