//! Hex and revert-output helpers shared across the rpc surface.

use alloy_primitives::{hex, U256};

/// ABI selector of `Error(string)`, the solidity revert wrapper.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Formats a value as a minimal `0x`-prefixed hex quantity (no leading zeros).
pub fn to_quantity(value: U256) -> String {
    if value.is_zero() {
        return "0x0".to_owned()
    }
    format!("0x{value:x}")
}

/// Encodes a string's bytes as `0x`-prefixed hex.
pub fn ascii_to_hex(s: &str) -> String {
    hex::encode_prefixed(s.as_bytes())
}

/// Decodes `0x`-prefixed hex back into a string, if the bytes are valid UTF-8.
pub fn hex_to_ascii(h: &str) -> Option<String> {
    let bytes = hex::decode(h).ok()?;
    String::from_utf8(bytes).ok()
}

/// Extracts a human-readable revert reason from EVM return data.
///
/// Understands the `Error(string)` ABI wrapping; falls back to interpreting
/// the payload as UTF-8 when it is not ABI-encoded. Returns `None` when
/// neither yields text.
pub fn decode_revert_reason(output: &[u8]) -> Option<String> {
    if output.len() >= 68 && output[0..4] == ERROR_STRING_SELECTOR {
        // selector | offset (32) | length (32) | data
        let len = U256::from_be_slice(&output[36..68]);
        let len = usize::try_from(len).ok()?;
        let data = output.get(68..68 + len)?;
        return String::from_utf8(data.to_vec()).ok()
    }
    if output.is_empty() {
        return None
    }
    String::from_utf8(output.to_vec()).ok().filter(|s| s.chars().all(|c| !c.is_control()))
}
