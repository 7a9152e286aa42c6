//! Network-wide constants.

use alloy_primitives::{address, Address, U256};

/// Number of weibar in one tinybar.
///
/// Hedera accounts balances are denominated in tinybar (10^-8 HBAR) while the
/// Ethereum surface works in weibar (10^-18 HBAR), so every value crossing the
/// boundary is scaled by this factor.
pub const TINYBAR_TO_WEIBAR_COEF: u128 = 10_000_000_000;

/// Total HBAR supply expressed in tinybar (50 billion HBAR).
pub const TOTAL_SUPPLY_TINYBARS: u64 = 5_000_000_000_000_000_000;

/// Smallest non-zero transaction value the network accepts, in weibar.
///
/// A value below one tinybar cannot be represented on the Hedera side, so
/// non-zero values under this threshold are rejected at precheck.
pub const ONE_TINYBAR_IN_WEIBAR: u128 = TINYBAR_TO_WEIBAR_COEF;

/// Default gas attributed to a synthetic transaction trace.
pub const DEFAULT_TX_GAS: u64 = 400_000;

/// The zero-address stand-in used as block beneficiary in raw block encoding.
pub const RAW_BLOCK_BENEFICIARY: Address = address!("0000000000000000000000000000000000000321");

/// `keccak256(rlp([]))`, the ommers hash of an empty ommers list.
pub const EMPTY_OMMERS_HASH: [u8; 32] = [
    0x1d, 0xcc, 0x4d, 0xe8, 0xde, 0xc7, 0x5d, 0x7a, 0xab, 0x85, 0xb5, 0x67, 0xb6, 0xcc, 0xd4,
    0x1a, 0xd3, 0x12, 0x45, 0x1b, 0x94, 0x8a, 0x74, 0x13, 0xf0, 0xa1, 0x42, 0xfd, 0x40, 0xd4,
    0x93, 0x47,
];

/// `keccak256(Transfer(address,address,uint256))`, the ERC-20/721 transfer
/// event signature synthetic transactions emit.
pub const TRANSFER_EVENT_SIGNATURE: [u8; 32] = [
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d,
    0xaa, 0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23,
    0xb3, 0xef,
];

/// Zero value as a `U256`, for callers that want a named constant.
pub const ZERO_VALUE: U256 = U256::ZERO;
