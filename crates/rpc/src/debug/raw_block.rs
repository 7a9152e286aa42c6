//! `debug_getRawBlock`: the block re-encoded in Ethereum's RLP wire form.
//!
//! The backend has no native RLP blocks, so one is reconstructed: a header
//! with the fixed beneficiary and zeroed consensus fields, the transactions
//! re-assembled from their mirror-node contract results, and empty ommers and
//! withdrawals lists.

use super::{BlockRef, DebugRelay};
use crate::RpcResult;
use alloy_rlp::{Encodable, Header};
use relay_mirror::{BlockResponse, ContractResult};
use relay_primitives::{
    constants::{EMPTY_OMMERS_HASH, RAW_BLOCK_BENEFICIARY},
    tinybar_to_weibar,
    transaction::{AccessList, Signature, Transaction, TransactionKind},
    Address, Bytes, RequestContext, SignedTransaction, B256, U256,
};
use tracing::{debug, warn};

// === impl DebugRelay ===

impl DebugRelay {
    /// Returns the RLP encoding of the block, or the literal `0x` when the
    /// block does not exist.
    pub async fn get_raw_block(
        &self,
        block: BlockRef,
        ctx: &RequestContext,
    ) -> RpcResult<String> {
        let Some(block) = self.resolve_block(&block).await? else {
            return Ok("0x".to_owned())
        };

        let to = block.timestamp.to.unwrap_or(block.timestamp.from);
        let mut results = self
            .mirror()
            .contract_results_in_range(block.timestamp.from, to)
            .await?;
        results.sort_by_key(|result| result.transaction_index.unwrap_or(u64::MAX));

        let mut transactions = Vec::new();
        for result in &results {
            match transaction_from_result(result) {
                Some(tx) => transactions.push(tx),
                // synthetic entries carry no signature and cannot be encoded
                None => debug!(target: "debug", %ctx, hash = %result.hash, "skipping unsigned result in raw block"),
            }
        }

        Ok(encode_raw_block(&block, &transactions, self.config().max_gas_limit))
    }
}

/// Reassembles the signed envelope of a contract result; `None` when the
/// result lacks the signature or fee fields (synthetic transactions).
fn transaction_from_result(result: &ContractResult) -> Option<SignedTransaction> {
    let v = result.v?;
    let r = parse_u256(result.r.as_deref()?)?;
    let s = parse_u256(result.s.as_deref()?)?;
    let nonce = result.nonce?;

    let to = match &result.to {
        Some(to) => TransactionKind::Call(to.parse::<Address>().ok()?),
        None => TransactionKind::Create,
    };
    let value = tinybar_to_weibar(result.amount.unwrap_or(0).max(0) as u64);
    let input: Bytes = result
        .function_parameters
        .as_deref()
        .and_then(|data| alloy_primitives::hex::decode(data.trim_start_matches("0x")).ok())
        .unwrap_or_default()
        .into();
    let gas_price = result.gas_price.as_deref().and_then(parse_u128).unwrap_or(0);
    let chain_id = result.chain_id.as_deref().and_then(parse_u64);

    let transaction = match result.tx_type.unwrap_or(0) {
        0 => {
            let (odd_y_parity, chain_id) = match v {
                27 => (false, None),
                28 => (true, None),
                v if v >= 35 => ((((v - 35) % 2) != 0), Some(((v - 35) / 2) as u64)),
                _ => (v != 0, chain_id),
            };
            return Some(SignedTransaction::new(
                Transaction::Legacy {
                    chain_id,
                    nonce,
                    gas_price,
                    gas_limit: result.gas_limit,
                    to,
                    value,
                    input,
                },
                Signature { r, s, odd_y_parity },
            ))
        }
        1 => Transaction::Eip2930 {
            chain_id: chain_id?,
            nonce,
            gas_price,
            gas_limit: result.gas_limit,
            to,
            value,
            input,
            access_list: AccessList::default(),
        },
        2 => Transaction::Eip1559 {
            chain_id: chain_id?,
            nonce,
            max_priority_fee_per_gas: result
                .max_priority_fee_per_gas
                .as_deref()
                .and_then(parse_u128)
                .unwrap_or(0),
            max_fee_per_gas: result
                .max_fee_per_gas
                .as_deref()
                .and_then(parse_u128)
                .unwrap_or(gas_price),
            gas_limit: result.gas_limit,
            to,
            value,
            input,
            access_list: AccessList::default(),
        },
        other => {
            warn!(target: "debug", hash = %result.hash, tx_type = other, "unknown type in raw block");
            return None
        }
    };

    Some(SignedTransaction::new(transaction, Signature { r, s, odd_y_parity: v != 0 }))
}

/// Encodes the block: `rlp([header, transactions, ommers, withdrawals])`.
fn encode_raw_block(
    block: &BlockResponse,
    transactions: &[SignedTransaction],
    gas_limit: u64,
) -> String {
    let header = encode_header(block, gas_limit);

    let mut tx_payload = Vec::new();
    for tx in transactions {
        match tx.transaction {
            // a legacy transaction is itself an rlp list
            Transaction::Legacy { .. } => tx.encode_enveloped(&mut tx_payload),
            // typed envelopes embed as opaque byte strings (EIP-2718)
            _ => tx.encoded().encode(&mut tx_payload),
        }
    }
    let mut tx_list = Vec::new();
    Header { list: true, payload_length: tx_payload.len() }.encode(&mut tx_list);
    tx_list.extend_from_slice(&tx_payload);

    // empty ommers and withdrawals lists
    let empty_list = [0xc0u8];

    let payload_length = header.len() + tx_list.len() + empty_list.len() * 2;
    let mut out = Vec::with_capacity(payload_length + 4);
    Header { list: true, payload_length }.encode(&mut out);
    out.extend_from_slice(&header);
    out.extend_from_slice(&tx_list);
    out.extend_from_slice(&empty_list);
    out.extend_from_slice(&empty_list);

    format!("0x{}", alloy_primitives::hex::encode(out))
}

fn encode_header(block: &BlockResponse, gas_limit: u64) -> Vec<u8> {
    let parent = hash_32(&block.previous_hash);
    let ommers = B256::from(EMPTY_OMMERS_HASH);
    let bloom = bloom_bytes(block.logs_bloom.as_deref());
    let nonce = Bytes::from_static(&[0u8; 8]);
    let zero = B256::ZERO;

    let mut payload = Vec::new();
    parent.encode(&mut payload);
    ommers.encode(&mut payload);
    RAW_BLOCK_BENEFICIARY.encode(&mut payload);
    zero.encode(&mut payload); // state root
    zero.encode(&mut payload); // transactions root
    zero.encode(&mut payload); // receipts root
    bloom.encode(&mut payload);
    U256::ZERO.encode(&mut payload); // difficulty
    block.number.encode(&mut payload);
    gas_limit.encode(&mut payload);
    block.gas_used.encode(&mut payload);
    block.timestamp.from.seconds.encode(&mut payload);
    Bytes::new().encode(&mut payload); // extra data
    zero.encode(&mut payload); // prev randao
    nonce.encode(&mut payload);
    0u64.encode(&mut payload); // base fee
    zero.encode(&mut payload); // withdrawals root

    let mut out = Vec::with_capacity(payload.len() + 4);
    Header { list: true, payload_length: payload.len() }.encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

/// Truncates the backend's 48-byte hash to Ethereum's 32 bytes.
fn hash_32(hash: &str) -> B256 {
    let digits = hash.trim_start_matches("0x");
    let bytes = alloy_primitives::hex::decode(digits).unwrap_or_default();
    let mut out = [0u8; 32];
    let n = bytes.len().min(32);
    out[..n].copy_from_slice(&bytes[..n]);
    B256::from(out)
}

fn bloom_bytes(bloom: Option<&str>) -> Bytes {
    let decoded = bloom
        .map(|b| b.trim_start_matches("0x"))
        .and_then(|b| alloy_primitives::hex::decode(b).ok())
        .filter(|b| b.len() == 256)
        .unwrap_or_else(|| vec![0u8; 256]);
    Bytes::from(decoded)
}

fn parse_u256(hex: &str) -> Option<U256> {
    U256::from_str_radix(hex.trim_start_matches("0x"), 16).ok()
}

fn parse_u128(hex: &str) -> Option<u128> {
    u128::from_str_radix(hex.trim_start_matches("0x"), 16).ok()
}

fn parse_u64(hex: &str) -> Option<u64> {
    u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok()
}
