//! Block references as clients pass them.

use crate::{RpcError, RpcResult};
use serde_json::Value;

/// A parsed block parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRef {
    /// `latest`, `pending`, `safe` or `finalized` — the backend has instant
    /// finality, so they all resolve to the newest block.
    Latest,
    /// `earliest`.
    Earliest,
    /// An explicit block number.
    Number(u64),
    /// A block hash.
    Hash(String),
}

// === impl BlockRef ===

impl BlockRef {
    /// Parses a block parameter value.
    pub fn parse(value: &Value) -> RpcResult<Self> {
        let Some(s) = value.as_str() else {
            return Err(RpcError::InvalidArguments(format!("invalid block parameter: {value}")))
        };
        Self::parse_str(s)
    }

    /// Parses a block parameter string.
    pub fn parse_str(s: &str) -> RpcResult<Self> {
        match s {
            "latest" | "pending" | "safe" | "finalized" => Ok(Self::Latest),
            "earliest" => Ok(Self::Earliest),
            hash if hash.len() == 66 && hash.starts_with("0x") => Ok(Self::Hash(hash.to_owned())),
            number => {
                let digits = number
                    .strip_prefix("0x")
                    .ok_or_else(|| {
                        RpcError::InvalidArguments(format!("invalid block parameter: {number}"))
                    })?;
                u64::from_str_radix(digits, 16)
                    .map(Self::Number)
                    .map_err(|_| {
                        RpcError::InvalidArguments(format!("invalid block parameter: {number}"))
                    })
            }
        }
    }

    /// The mirror-node path segment this reference queries.
    pub fn to_mirror_ref(&self) -> Option<String> {
        match self {
            Self::Latest => None,
            Self::Earliest => Some("0".to_owned()),
            Self::Number(n) => Some(n.to_string()),
            Self::Hash(h) => Some(h.clone()),
        }
    }
}
