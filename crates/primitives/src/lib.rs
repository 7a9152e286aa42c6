//! Commonly used types for the Hedera JSON-RPC relay.
//!
//! The relay fronts a Hedera network with an Ethereum-compatible RPC surface.
//! This crate holds the types both sides of that translation share: the signed
//! transaction envelope as Ethereum clients submit it, Hedera entity ids and
//! mirror-node timestamps, and the tinybar/weibar unit conversions every
//! value-bearing field passes through.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

pub mod constants;
mod context;
mod entity;
mod hex;
pub mod transaction;
mod units;

pub use context::RequestContext;
pub use entity::{EntityId, EntityIdParseError, MirrorTimestamp, TimestampParseError};
pub use hex::{ascii_to_hex, decode_revert_reason, hex_to_ascii, to_quantity};
pub use transaction::{
    Signature, SignedTransaction, Transaction, TransactionKind, TransactionParseError, TxType,
};
pub use units::{
    tinybar_to_weibar, weibar_hex_to_tinybar, weibar_to_tinybar, UnitConversionError,
};

pub use alloy_primitives::{keccak256, Address, Bytes, B256, U256, U64};

/// A transaction hash.
pub type TxHash = B256;
