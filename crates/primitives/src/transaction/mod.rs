//! The signed transaction envelope as received over `eth_sendRawTransaction`.

mod access_list;
mod signature;
mod tx_type;

use crate::TxHash;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Decodable, Encodable, Error as RlpError, Header, EMPTY_STRING_CODE};
use bytes::BufMut;

pub use access_list::{AccessList, AccessListItem};
pub use signature::Signature;
pub use tx_type::{
    TxType, EIP1559_TX_TYPE_ID, EIP2930_TX_TYPE_ID, EIP4844_TX_TYPE_ID, LEGACY_TX_TYPE_ID,
};

/// Errors produced while decoding a raw transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionParseError {
    /// The payload was empty.
    #[error("empty raw transaction payload")]
    Empty,
    /// EIP-4844 blob transactions carry sidecars the backend cannot store.
    #[error("blob transactions (type 3) are not supported")]
    BlobTransactionsUnsupported,
    /// An EIP-2718 type byte the relay does not know.
    #[error("unsupported transaction type {0}")]
    UnsupportedType(u8),
    /// The signature values did not yield a recoverable public key.
    #[error("invalid transaction signature")]
    InvalidSignature,
    /// Malformed RLP.
    #[error(transparent)]
    Rlp(#[from] RlpError),
}

/// Whether a transaction calls an existing account or creates a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionKind {
    /// A contract creation (the `to` field is empty).
    #[default]
    Create,
    /// A call to `Address`.
    Call(Address),
}

impl TransactionKind {
    /// Returns the call target, `None` for creations.
    pub const fn to(&self) -> Option<&Address> {
        match self {
            Self::Create => None,
            Self::Call(to) => Some(to),
        }
    }
}

impl Encodable for TransactionKind {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            Self::Call(to) => to.encode(out),
            Self::Create => out.put_u8(EMPTY_STRING_CODE),
        }
    }

    fn length(&self) -> usize {
        match self {
            Self::Call(to) => to.length(),
            Self::Create => 1,
        }
    }
}

impl Decodable for TransactionKind {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        match buf.first() {
            Some(&EMPTY_STRING_CODE) => {
                *buf = &buf[1..];
                Ok(Self::Create)
            }
            Some(_) => Ok(Self::Call(Address::decode(buf)?)),
            None => Err(RlpError::InputTooShort),
        }
    }
}

/// An unsigned transaction body.
///
/// One variant per accepted EIP-2718 type. Field order within each variant
/// matches the canonical RLP field order so the codec below stays mechanical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transaction {
    /// Legacy transaction, optionally replay-protected (EIP-155).
    Legacy {
        /// EIP-155 chain id, extracted from `v`; `None` for pre-EIP-155 payloads.
        chain_id: Option<u64>,
        /// Sender nonce.
        nonce: u64,
        /// Price per unit of gas, in weibar.
        gas_price: u128,
        /// Gas limit.
        gas_limit: u64,
        /// Call target or creation.
        to: TransactionKind,
        /// Transferred value, in weibar.
        value: U256,
        /// Call data or init code.
        input: Bytes,
    },
    /// EIP-2930 transaction with an access list.
    Eip2930 {
        /// Chain id.
        chain_id: u64,
        /// Sender nonce.
        nonce: u64,
        /// Price per unit of gas, in weibar.
        gas_price: u128,
        /// Gas limit.
        gas_limit: u64,
        /// Call target or creation.
        to: TransactionKind,
        /// Transferred value, in weibar.
        value: U256,
        /// Call data or init code.
        input: Bytes,
        /// Warmed addresses and storage keys.
        access_list: AccessList,
    },
    /// EIP-1559 transaction with a fee cap and priority fee.
    Eip1559 {
        /// Chain id.
        chain_id: u64,
        /// Sender nonce.
        nonce: u64,
        /// Maximum priority fee per gas, in weibar.
        max_priority_fee_per_gas: u128,
        /// Maximum total fee per gas, in weibar.
        max_fee_per_gas: u128,
        /// Gas limit.
        gas_limit: u64,
        /// Call target or creation.
        to: TransactionKind,
        /// Transferred value, in weibar.
        value: U256,
        /// Call data or init code.
        input: Bytes,
        /// Warmed addresses and storage keys.
        access_list: AccessList,
    },
}

// === impl Transaction ===

impl Transaction {
    /// Returns the EIP-2718 type of this transaction.
    pub const fn tx_type(&self) -> TxType {
        match self {
            Self::Legacy { .. } => TxType::Legacy,
            Self::Eip2930 { .. } => TxType::Eip2930,
            Self::Eip1559 { .. } => TxType::Eip1559,
        }
    }

    /// Returns the chain id if the transaction is replay-protected.
    pub const fn chain_id(&self) -> Option<u64> {
        match self {
            Self::Legacy { chain_id, .. } => *chain_id,
            Self::Eip2930 { chain_id, .. } | Self::Eip1559 { chain_id, .. } => Some(*chain_id),
        }
    }

    /// Returns the sender nonce.
    pub const fn nonce(&self) -> u64 {
        match self {
            Self::Legacy { nonce, .. } |
            Self::Eip2930 { nonce, .. } |
            Self::Eip1559 { nonce, .. } => *nonce,
        }
    }

    /// Returns the gas limit.
    pub const fn gas_limit(&self) -> u64 {
        match self {
            Self::Legacy { gas_limit, .. } |
            Self::Eip2930 { gas_limit, .. } |
            Self::Eip1559 { gas_limit, .. } => *gas_limit,
        }
    }

    /// Returns the call target or creation marker.
    pub const fn kind(&self) -> &TransactionKind {
        match self {
            Self::Legacy { to, .. } | Self::Eip2930 { to, .. } | Self::Eip1559 { to, .. } => to,
        }
    }

    /// Returns the call target, `None` for contract creations.
    pub const fn to(&self) -> Option<&Address> {
        self.kind().to()
    }

    /// Returns the transferred value in weibar.
    pub const fn value(&self) -> U256 {
        match self {
            Self::Legacy { value, .. } |
            Self::Eip2930 { value, .. } |
            Self::Eip1559 { value, .. } => *value,
        }
    }

    /// Returns the call data.
    pub const fn input(&self) -> &Bytes {
        match self {
            Self::Legacy { input, .. } |
            Self::Eip2930 { input, .. } |
            Self::Eip1559 { input, .. } => input,
        }
    }

    /// Returns the maximum price per gas the sender is willing to pay.
    ///
    /// For dynamic-fee transactions this is `max_fee_per_gas`; it bounds the
    /// effective price and is what pool replacement compares.
    pub const fn max_gas_price(&self) -> u128 {
        match self {
            Self::Legacy { gas_price, .. } | Self::Eip2930 { gas_price, .. } => *gas_price,
            Self::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }

    /// Returns the max priority fee per gas, if the type carries one.
    pub const fn max_priority_fee_per_gas(&self) -> Option<u128> {
        match self {
            Self::Legacy { .. } | Self::Eip2930 { .. } => None,
            Self::Eip1559 { max_priority_fee_per_gas, .. } => Some(*max_priority_fee_per_gas),
        }
    }

    /// Returns the price per gas that would actually be charged given
    /// `base_fee`.
    pub fn effective_gas_price(&self, base_fee: Option<u128>) -> u128 {
        match self {
            Self::Legacy { gas_price, .. } | Self::Eip2930 { gas_price, .. } => *gas_price,
            Self::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas, .. } => match base_fee {
                Some(base) => {
                    (*max_fee_per_gas).min(base.saturating_add(*max_priority_fee_per_gas))
                }
                None => *max_fee_per_gas,
            },
        }
    }

    /// RLP payload length of the unsigned fields, in canonical order.
    fn fields_payload_len(&self) -> usize {
        match self {
            Self::Legacy { nonce, gas_price, gas_limit, to, value, input, .. } => {
                nonce.length() +
                    gas_price.length() +
                    gas_limit.length() +
                    to.length() +
                    value.length() +
                    input.0.length()
            }
            Self::Eip2930 {
                chain_id,
                nonce,
                gas_price,
                gas_limit,
                to,
                value,
                input,
                access_list,
            } => {
                chain_id.length() +
                    nonce.length() +
                    gas_price.length() +
                    gas_limit.length() +
                    to.length() +
                    value.length() +
                    input.0.length() +
                    access_list.length()
            }
            Self::Eip1559 {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                input,
                access_list,
            } => {
                chain_id.length() +
                    nonce.length() +
                    max_priority_fee_per_gas.length() +
                    max_fee_per_gas.length() +
                    gas_limit.length() +
                    to.length() +
                    value.length() +
                    input.0.length() +
                    access_list.length()
            }
        }
    }

    /// Encodes the unsigned fields in canonical order, without a list header.
    fn encode_fields(&self, out: &mut dyn BufMut) {
        match self {
            Self::Legacy { nonce, gas_price, gas_limit, to, value, input, .. } => {
                nonce.encode(out);
                gas_price.encode(out);
                gas_limit.encode(out);
                to.encode(out);
                value.encode(out);
                input.0.encode(out);
            }
            Self::Eip2930 {
                chain_id,
                nonce,
                gas_price,
                gas_limit,
                to,
                value,
                input,
                access_list,
            } => {
                chain_id.encode(out);
                nonce.encode(out);
                gas_price.encode(out);
                gas_limit.encode(out);
                to.encode(out);
                value.encode(out);
                input.0.encode(out);
                access_list.encode(out);
            }
            Self::Eip1559 {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                input,
                access_list,
            } => {
                chain_id.encode(out);
                nonce.encode(out);
                max_priority_fee_per_gas.encode(out);
                max_fee_per_gas.encode(out);
                gas_limit.encode(out);
                to.encode(out);
                value.encode(out);
                input.0.encode(out);
                access_list.encode(out);
            }
        }
    }

    /// Computes the hash the sender signed.
    ///
    /// Legacy replay-protected payloads append `[chain_id, 0, 0]` per EIP-155;
    /// typed payloads prefix the type byte before the unsigned field list.
    pub fn signature_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(self.fields_payload_len() + 16);
        match self {
            Self::Legacy { chain_id, .. } => {
                let mut payload_length = self.fields_payload_len();
                if let Some(id) = chain_id {
                    payload_length += id.length() + 2;
                }
                Header { list: true, payload_length }.encode(&mut buf);
                self.encode_fields(&mut buf);
                if let Some(id) = chain_id {
                    id.encode(&mut buf);
                    0u8.encode(&mut buf);
                    0u8.encode(&mut buf);
                }
            }
            Self::Eip2930 { .. } | Self::Eip1559 { .. } => {
                buf.put_u8(self.tx_type().as_u8());
                Header { list: true, payload_length: self.fields_payload_len() }.encode(&mut buf);
                self.encode_fields(&mut buf);
            }
        }
        keccak256(&buf)
    }
}

/// A signed transaction together with its envelope hash.
///
/// Produced exclusively by [`SignedTransaction::decode`], so a value of this
/// type always round-trips through [`SignedTransaction::encoded`] to the bytes
/// it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignedTransaction {
    /// The unsigned body.
    pub transaction: Transaction,
    /// The signature over [`Transaction::signature_hash`].
    pub signature: Signature,
    /// Keccak hash of the EIP-2718 envelope bytes.
    hash: TxHash,
}

// === impl SignedTransaction ===

impl SignedTransaction {
    /// Assembles a signed transaction from its parts, computing the envelope
    /// hash.
    pub fn new(transaction: Transaction, signature: Signature) -> Self {
        let mut this = Self { transaction, signature, hash: B256::ZERO };
        let mut buf = Vec::with_capacity(this.transaction.fields_payload_len() + 80);
        this.encode_enveloped(&mut buf);
        this.hash = keccak256(&buf);
        this
    }

    /// Decodes a raw transaction payload as submitted by an Ethereum client.
    ///
    /// Blob transactions (type 3) and unknown future types are rejected here
    /// so the rest of the relay only ever sees the three supported shapes.
    pub fn decode(raw: &[u8]) -> Result<Self, TransactionParseError> {
        let first = *raw.first().ok_or(TransactionParseError::Empty)?;
        if first >= 0xc0 {
            return Self::decode_legacy(raw)
        }
        match first {
            EIP2930_TX_TYPE_ID | EIP1559_TX_TYPE_ID => Self::decode_typed(raw),
            EIP4844_TX_TYPE_ID => Err(TransactionParseError::BlobTransactionsUnsupported),
            t if t <= 0x7f => Err(TransactionParseError::UnsupportedType(t)),
            _ => Err(RlpError::Custom("expected rlp list or typed envelope").into()),
        }
    }

    fn decode_legacy(raw: &[u8]) -> Result<Self, TransactionParseError> {
        let mut buf = raw;
        let header = Header::decode(&mut buf)?;
        if !header.list {
            return Err(RlpError::UnexpectedString.into())
        }
        if buf.len() < header.payload_length {
            return Err(RlpError::InputTooShort.into())
        }

        let nonce = u64::decode(&mut buf)?;
        let gas_price = u128::decode(&mut buf)?;
        let gas_limit = u64::decode(&mut buf)?;
        let to = TransactionKind::decode(&mut buf)?;
        let value = U256::decode(&mut buf)?;
        let input = Bytes::from(bytes::Bytes::decode(&mut buf)?);
        let (signature, chain_id) = Signature::decode_with_eip155_chain_id(&mut buf)?;

        let transaction =
            Transaction::Legacy { chain_id, nonce, gas_price, gas_limit, to, value, input };
        Ok(Self { transaction, signature, hash: keccak256(raw) })
    }

    fn decode_typed(raw: &[u8]) -> Result<Self, TransactionParseError> {
        let tx_type = raw[0];
        let mut buf = &raw[1..];
        let header = Header::decode(&mut buf)?;
        if !header.list {
            return Err(RlpError::UnexpectedString.into())
        }
        if buf.len() < header.payload_length {
            return Err(RlpError::InputTooShort.into())
        }

        let chain_id = u64::decode(&mut buf)?;
        let nonce = u64::decode(&mut buf)?;

        let transaction = if tx_type == EIP2930_TX_TYPE_ID {
            let gas_price = u128::decode(&mut buf)?;
            let gas_limit = u64::decode(&mut buf)?;
            let to = TransactionKind::decode(&mut buf)?;
            let value = U256::decode(&mut buf)?;
            let input = Bytes::from(bytes::Bytes::decode(&mut buf)?);
            let access_list = AccessList::decode(&mut buf)?;
            Transaction::Eip2930 {
                chain_id,
                nonce,
                gas_price,
                gas_limit,
                to,
                value,
                input,
                access_list,
            }
        } else {
            let max_priority_fee_per_gas = u128::decode(&mut buf)?;
            let max_fee_per_gas = u128::decode(&mut buf)?;
            let gas_limit = u64::decode(&mut buf)?;
            let to = TransactionKind::decode(&mut buf)?;
            let value = U256::decode(&mut buf)?;
            let input = Bytes::from(bytes::Bytes::decode(&mut buf)?);
            let access_list = AccessList::decode(&mut buf)?;
            Transaction::Eip1559 {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                input,
                access_list,
            }
        };

        let signature = Signature::decode_parity(&mut buf)?;
        Ok(Self { transaction, signature, hash: keccak256(raw) })
    }

    /// Re-encodes the EIP-2718 envelope (type byte plus signed field list).
    pub fn encoded(&self) -> Bytes {
        let mut buf = Vec::with_capacity(self.transaction.fields_payload_len() + 80);
        self.encode_enveloped(&mut buf);
        buf.into()
    }

    /// Encodes the signed envelope into `out`.
    pub fn encode_enveloped(&self, out: &mut dyn BufMut) {
        match &self.transaction {
            Transaction::Legacy { chain_id, .. } => {
                let payload_length = self.transaction.fields_payload_len() +
                    self.signature.payload_len_with_eip155_chain_id(*chain_id);
                Header { list: true, payload_length }.encode(out);
                self.transaction.encode_fields(out);
                self.signature.encode_with_eip155_chain_id(out, *chain_id);
            }
            Transaction::Eip2930 { .. } | Transaction::Eip1559 { .. } => {
                out.put_u8(self.transaction.tx_type().as_u8());
                let payload_length = self.transaction.fields_payload_len() +
                    self.signature.parity_payload_len();
                Header { list: true, payload_length }.encode(out);
                self.transaction.encode_fields(out);
                self.signature.encode_parity(out);
            }
        }
    }

    /// Keccak hash of the envelope bytes, as Ethereum clients identify the
    /// transaction.
    pub const fn hash(&self) -> TxHash {
        self.hash
    }

    /// Recovers the sender address from the signature.
    pub fn recover_signer(&self) -> Result<Address, TransactionParseError> {
        self.signature.recover_signer(self.transaction.signature_hash())
    }
}

impl std::ops::Deref for SignedTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}
