use crate::transaction::TransactionParseError;
use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_rlp::{Decodable, Encodable, Error as RlpError};
use bytes::BufMut;
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, SECP256K1,
};

/// An ECDSA signature over the transaction payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    /// The R field of the signature.
    pub r: U256,
    /// The S field of the signature.
    pub s: U256,
    /// Whether the Y coordinate of the curve point recovered from `r` is odd.
    ///
    /// For legacy transactions this is folded into `v` together with the chain
    /// id (EIP-155); typed transactions carry it directly.
    pub odd_y_parity: bool,
}

impl Signature {
    /// Returns the legacy `v` value for this signature.
    ///
    /// With a chain id the EIP-155 form `chain_id * 2 + 35 + parity` is used,
    /// otherwise the pre-EIP-155 `27 + parity`.
    pub const fn v(&self, chain_id: Option<u64>) -> u64 {
        let parity = self.odd_y_parity as u64;
        match chain_id {
            Some(id) => id * 2 + 35 + parity,
            None => 27 + parity,
        }
    }

    /// Decodes `v`, `r`, `s` of a legacy transaction, extracting the chain id
    /// from the EIP-155 `v` value if present.
    pub(crate) fn decode_with_eip155_chain_id(
        buf: &mut &[u8],
    ) -> Result<(Self, Option<u64>), RlpError> {
        let v = u64::decode(buf)?;
        let r = U256::decode(buf)?;
        let s = U256::decode(buf)?;

        let (odd_y_parity, chain_id) = match v {
            27 => (false, None),
            28 => (true, None),
            v if v >= 35 => (((v - 35) % 2) != 0, Some((v - 35) / 2)),
            _ => return Err(RlpError::Custom("invalid legacy v value")),
        };

        Ok((Self { r, s, odd_y_parity }, chain_id))
    }

    /// Decodes the `y_parity`, `r`, `s` tail of a typed transaction.
    pub(crate) fn decode_parity(buf: &mut &[u8]) -> Result<Self, RlpError> {
        let odd_y_parity = bool::decode(buf)?;
        let r = U256::decode(buf)?;
        let s = U256::decode(buf)?;
        Ok(Self { r, s, odd_y_parity })
    }

    /// RLP length of the legacy `v`, `r`, `s` encoding.
    pub(crate) fn payload_len_with_eip155_chain_id(&self, chain_id: Option<u64>) -> usize {
        self.v(chain_id).length() + self.r.length() + self.s.length()
    }

    /// Encodes `v`, `r`, `s` in the legacy form.
    pub(crate) fn encode_with_eip155_chain_id(&self, out: &mut dyn BufMut, chain_id: Option<u64>) {
        self.v(chain_id).encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    /// RLP length of the typed `y_parity`, `r`, `s` encoding.
    pub(crate) fn parity_payload_len(&self) -> usize {
        self.odd_y_parity.length() + self.r.length() + self.s.length()
    }

    /// Encodes `y_parity`, `r`, `s` in the typed form.
    pub(crate) fn encode_parity(&self, out: &mut dyn BufMut) {
        self.odd_y_parity.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    /// Recovers the address that produced this signature over `hash`.
    pub fn recover_signer(&self, hash: B256) -> Result<Address, TransactionParseError> {
        let mut sig = [0u8; 64];
        sig[0..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        sig[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());

        let signature = RecoverableSignature::from_compact(
            &sig,
            RecoveryId::from_i32(self.odd_y_parity as i32)
                .map_err(|_| TransactionParseError::InvalidSignature)?,
        )
        .map_err(|_| TransactionParseError::InvalidSignature)?;

        let public = SECP256K1
            .recover_ecdsa(&Message::from_digest(hash.0), &signature)
            .map_err(|_| TransactionParseError::InvalidSignature)?;

        let digest = keccak256(&public.serialize_uncompressed()[1..]);
        Ok(Address::from_slice(&digest[12..]))
    }
}
