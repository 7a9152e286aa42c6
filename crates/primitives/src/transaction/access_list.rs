use alloy_primitives::{Address, B256};
use alloy_rlp::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};
use serde::{Deserialize, Serialize};

/// A single entry of an EIP-2930 access list.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, RlpEncodable, RlpDecodable, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// The warmed account address.
    pub address: Address,
    /// The warmed storage keys of that account.
    pub storage_keys: Vec<B256>,
}

/// An EIP-2930 access list.
///
/// The relay does not act on access lists (Hedera has no warm/cold gas
/// schedule) but carries them so the envelope re-encodes byte-identically.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Default,
    RlpEncodableWrapper,
    RlpDecodableWrapper,
    Serialize,
    Deserialize,
)]
pub struct AccessList(pub Vec<AccessListItem>);
