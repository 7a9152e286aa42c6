//! Wire shapes of the `eth_*` read surface.
//!
//! The mirror node's data model differs from Ethereum's in small ways (48-byte
//! block hashes, tinybar amounts); these types are the exact camelCase JSON
//! an Ethereum client expects, and the constructors below do the shaping.

use relay_mirror::{ContractResult, LogEntry};
use relay_primitives::{tinybar_to_weibar, to_quantity, U256};
use serde::{Deserialize, Serialize};

/// A 256-bit zero word.
pub(crate) const ZERO_HASH: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// An empty 2048-bit logs bloom.
pub(crate) fn zero_bloom() -> String {
    format!("0x{}", "0".repeat(512))
}

/// Truncates a mirror-node hash (48 bytes on Hedera) to the 32 bytes Ethereum
/// clients expect.
pub(crate) fn to_eth_hash(hash: &str) -> String {
    if hash.len() > 66 {
        hash[..66].to_owned()
    } else {
        hash.to_owned()
    }
}

/// Renders an optional tinybar amount as a weibar quantity.
pub(crate) fn tinybar_amount_to_quantity(amount: Option<i64>) -> String {
    let tinybar = amount.unwrap_or(0).max(0) as u64;
    to_quantity(tinybar_to_weibar(tinybar))
}

/// An `eth_getBlockByNumber` / `eth_getBlockByHash` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    /// Block number.
    pub number: String,
    /// Block hash, truncated to 32 bytes.
    pub hash: String,
    /// Hash of the previous block.
    pub parent_hash: String,
    /// Always the hash of an empty ommers list.
    pub sha3_uncles: String,
    /// Always eight zero bytes.
    pub nonce: String,
    /// Always zero.
    pub mix_hash: String,
    /// Bloom of the block's logs.
    pub logs_bloom: String,
    /// Not exposed by the backend; zero.
    pub transactions_root: String,
    /// Not exposed by the backend; zero.
    pub state_root: String,
    /// Not exposed by the backend; zero.
    pub receipts_root: String,
    /// The fixed block beneficiary.
    pub miner: String,
    /// Always zero.
    pub difficulty: String,
    /// Always zero.
    pub total_difficulty: String,
    /// Always empty.
    pub extra_data: String,
    /// Block size in bytes.
    pub size: String,
    /// Network block gas limit.
    pub gas_limit: String,
    /// Gas used by the block.
    pub gas_used: String,
    /// Start-of-block consensus time, unix seconds.
    pub timestamp: String,
    /// Current network gas price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<String>,
    /// Always empty.
    pub uncles: Vec<String>,
    /// Hashes, or full objects when requested.
    pub transactions: Vec<serde_json::Value>,
}

/// An `eth_getTransactionByHash` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Hash of the containing block.
    pub block_hash: Option<String>,
    /// Number of the containing block.
    pub block_number: Option<String>,
    /// Sender address.
    pub from: String,
    /// Gas limit.
    pub gas: String,
    /// Effective gas price.
    pub gas_price: String,
    /// Fee cap, dynamic-fee transactions only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    /// Priority fee, dynamic-fee transactions only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    /// Transaction hash.
    pub hash: String,
    /// Call data.
    pub input: String,
    /// Sender nonce.
    pub nonce: String,
    /// Callee, `null` for creations.
    pub to: Option<String>,
    /// Position within the block.
    pub transaction_index: Option<String>,
    /// Transferred value in weibar.
    pub value: String,
    /// EIP-2718 type.
    #[serde(rename = "type")]
    pub tx_type: String,
    /// Signature recovery value.
    pub v: String,
    /// Signature R.
    pub r: String,
    /// Signature S.
    pub s: String,
    /// Chain id, when replay-protected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
}

// === impl RpcTransaction ===

impl RpcTransaction {
    /// Shapes a mirror-node contract result into the wire form.
    pub(crate) fn from_contract_result(result: &ContractResult, fallback_price: &str) -> Self {
        Self {
            block_hash: result.block_hash.as_deref().map(to_eth_hash),
            block_number: result.block_number.map(|n| to_quantity(U256::from(n))),
            from: result.from.clone(),
            gas: to_quantity(U256::from(result.gas_limit)),
            gas_price: result
                .gas_price
                .clone()
                .unwrap_or_else(|| fallback_price.to_owned()),
            max_fee_per_gas: result.max_fee_per_gas.clone(),
            max_priority_fee_per_gas: result.max_priority_fee_per_gas.clone(),
            hash: result.hash.clone(),
            input: result.function_parameters.clone().unwrap_or_else(|| "0x".to_owned()),
            nonce: to_quantity(U256::from(result.nonce.unwrap_or(0))),
            to: result.to.clone(),
            transaction_index: result.transaction_index.map(|i| to_quantity(U256::from(i))),
            value: tinybar_amount_to_quantity(result.amount),
            tx_type: to_quantity(U256::from(result.tx_type.unwrap_or(0))),
            v: to_quantity(U256::from(result.v.unwrap_or(0).max(0) as u64)),
            r: result.r.clone().unwrap_or_else(|| ZERO_HASH.to_owned()),
            s: result.s.clone().unwrap_or_else(|| ZERO_HASH.to_owned()),
            chain_id: result.chain_id.clone(),
        }
    }
}

/// One receipt log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    /// Emitting contract.
    pub address: String,
    /// Hash of the containing block.
    pub block_hash: Option<String>,
    /// Number of the containing block.
    pub block_number: Option<String>,
    /// ABI payload.
    pub data: String,
    /// Position within the block.
    pub log_index: String,
    /// Never true; the backend has no reorgs.
    pub removed: bool,
    /// Indexed topics.
    pub topics: Vec<String>,
    /// Hash of the emitting transaction.
    pub transaction_hash: String,
    /// Position of the transaction within the block.
    pub transaction_index: Option<String>,
}

// === impl RpcLog ===

impl RpcLog {
    /// Shapes a mirror-node log entry into the wire form.
    pub(crate) fn from_log_entry(log: &LogEntry) -> Self {
        Self {
            address: log.address.clone(),
            block_hash: log.block_hash.as_deref().map(to_eth_hash),
            block_number: log.block_number.map(|n| to_quantity(U256::from(n))),
            data: log.data.clone().unwrap_or_else(|| "0x".to_owned()),
            log_index: to_quantity(U256::from(log.index)),
            removed: false,
            topics: log.topics.clone(),
            transaction_hash: log.transaction_hash.clone(),
            transaction_index: log.transaction_index.map(|i| to_quantity(U256::from(i))),
        }
    }
}

/// An `eth_getTransactionReceipt` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// Hash of the containing block.
    pub block_hash: Option<String>,
    /// Number of the containing block.
    pub block_number: Option<String>,
    /// Address of the created contract, creations only.
    pub contract_address: Option<String>,
    /// Gas used up to and including this transaction.
    pub cumulative_gas_used: String,
    /// Price actually paid per gas.
    pub effective_gas_price: String,
    /// Sender.
    pub from: String,
    /// Gas used by this transaction.
    pub gas_used: String,
    /// Emitted logs.
    pub logs: Vec<RpcLog>,
    /// Bloom of the emitted logs.
    pub logs_bloom: String,
    /// `0x1` on success, `0x0` on EVM-level failure.
    pub status: String,
    /// Callee.
    pub to: Option<String>,
    /// Transaction hash.
    pub transaction_hash: String,
    /// Position within the block.
    pub transaction_index: Option<String>,
    /// EIP-2718 type.
    #[serde(rename = "type")]
    pub tx_type: String,
}

/// An `eth_feeHistory` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeHistory {
    /// Base fee per block, one more entry than blocks requested.
    pub base_fee_per_gas: Vec<String>,
    /// Fill ratio per block.
    pub gas_used_ratio: Vec<f64>,
    /// First block of the window.
    pub oldest_block: String,
    /// Priority-fee percentiles per block, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<Vec<Vec<String>>>,
}
