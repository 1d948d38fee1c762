//! Base64 decoding utilities
//!
//! VMess payloads and wrapped link lists are Base64 in the wild with every
//! combination of alphabet and padding, so decoding tries the variants in
//! turn.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::{DecodeError, Engine};
use tracing::trace;

/// Decodes Base64 content, trying multiple variants
///
/// Attempts, in order:
/// 1. Standard Base64
/// 2. URL-safe Base64
/// 3. URL-safe Base64 without padding
/// 4. Standard/URL-safe with padding added
///
/// Whitespace in the input is removed before decoding. On failure the error
/// of the standard-alphabet attempt is returned.
pub fn decode_base64(content: &str) -> Result<Vec<u8>, DecodeError> {
    // Remove all whitespace (handles line breaks within Base64)
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    trace!(
        "Attempting Base64 decode, cleaned length: {} bytes",
        cleaned.len()
    );

    let standard_err = match STANDARD.decode(&cleaned) {
        Ok(decoded) => {
            trace!("Decoded using standard Base64");
            return Ok(decoded);
        }
        Err(e) => e,
    };

    if let Ok(decoded) = URL_SAFE.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64");
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE_NO_PAD.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64 without padding");
        return Ok(decoded);
    }

    let padded = add_base64_padding(&cleaned);
    if let Ok(decoded) = STANDARD.decode(&padded) {
        trace!("Decoded using standard Base64 with added padding");
        return Ok(decoded);
    }
    if let Ok(decoded) = URL_SAFE.decode(&padded) {
        trace!("Decoded using URL-safe Base64 with added padding");
        return Ok(decoded);
    }

    Err(standard_err)
}

/// Adds '=' padding until the length is a multiple of 4
pub fn add_base64_padding(s: &str) -> String {
    let mut result = s.to_string();
    while !result.len().is_multiple_of(4) {
        result.push('=');
    }
    result
}
