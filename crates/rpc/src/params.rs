//! Positional parameter extraction.

use crate::{RpcError, RpcResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extracts the required parameter at `index`.
pub(crate) fn require<T: DeserializeOwned>(params: &[Value], index: usize) -> RpcResult<T> {
    let value = params
        .get(index)
        .ok_or_else(|| RpcError::InvalidArguments(format!("missing parameter {index}")))?;
    serde_json::from_value(value.clone()).map_err(|err| {
        RpcError::InvalidArguments(format!("malformed parameter {index}: {err}"))
    })
}

/// Extracts the optional parameter at `index`; `null` counts as absent.
pub(crate) fn optional<T: DeserializeOwned>(
    params: &[Value],
    index: usize,
) -> RpcResult<Option<T>> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|err| {
            RpcError::InvalidArguments(format!("malformed parameter {index}: {err}"))
        }),
    }
}

/// Extracts a `0x`-prefixed quantity at `index` as a `u64`.
pub(crate) fn quantity_u64(params: &[Value], index: usize) -> RpcResult<u64> {
    let raw: String = require(params, index)?;
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::InvalidArguments(format!("invalid quantity: {raw}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| RpcError::InvalidArguments(format!("invalid quantity: {raw}")))
}

/// Decodes `0x`-prefixed hex payload bytes.
pub(crate) fn hex_bytes(raw: &str) -> RpcResult<Vec<u8>> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::InvalidArguments("expected 0x-prefixed data".to_owned()))?;
    alloy_primitives::hex::decode(digits)
        .map_err(|err| RpcError::InvalidArguments(format!("malformed hex data: {err}")))
}
