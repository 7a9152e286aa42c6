use alloy_primitives::U64;

/// Identifier for legacy transactions, for which there is no EIP-2718 type byte.
pub const LEGACY_TX_TYPE_ID: u8 = 0;

/// Identifier for [`TxType::Eip2930`] transactions.
pub const EIP2930_TX_TYPE_ID: u8 = 1;

/// Identifier for [`TxType::Eip1559`] transactions.
pub const EIP1559_TX_TYPE_ID: u8 = 2;

/// Identifier for EIP-4844 blob transactions, which the relay rejects.
pub const EIP4844_TX_TYPE_ID: u8 = 3;

/// Transaction type as introduced by EIP-2718.
///
/// The relay accepts legacy, EIP-2930 and EIP-1559 payloads. Blob transactions
/// (type 3) carry sidecars the Hedera network cannot store and are rejected at
/// decode time, so they never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxType {
    /// Legacy transaction pre EIP-2718.
    #[default]
    Legacy,
    /// Transaction with an access list ([EIP-2930](https://eips.ethereum.org/EIPS/eip-2930)).
    Eip2930,
    /// Transaction with priority fee ([EIP-1559](https://eips.ethereum.org/EIPS/eip-1559)).
    Eip1559,
}

impl TxType {
    /// Returns the EIP-2718 type byte, `0` for legacy.
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Legacy => LEGACY_TX_TYPE_ID,
            Self::Eip2930 => EIP2930_TX_TYPE_ID,
            Self::Eip1559 => EIP1559_TX_TYPE_ID,
        }
    }
}

impl From<TxType> for U64 {
    fn from(value: TxType) -> Self {
        Self::from(value.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_type_roundtrip_u8() {
        assert_eq!(TxType::Legacy.as_u8(), 0);
        assert_eq!(TxType::Eip2930.as_u8(), 1);
        assert_eq!(TxType::Eip1559.as_u8(), 2);
    }
}
