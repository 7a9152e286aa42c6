//! Tinybar/weibar unit conversions.
//!
//! Balances on the Hedera side are held in tinybar, the Ethereum surface works
//! in weibar. The scaling factor is exactly `10^10`, and any conversion result
//! above the total HBAR supply is rejected rather than silently truncated.

use crate::constants::{TINYBAR_TO_WEIBAR_COEF, TOTAL_SUPPLY_TINYBARS};
use alloy_primitives::U256;

/// Errors produced by unit conversions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitConversionError {
    /// The value converts to more tinybar than exist.
    #[error("value {0} weibar exceeds total supply")]
    ValueOutOfRange(U256),
    /// The input was not a valid `0x`-prefixed quantity.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
}

/// Converts a tinybar amount to weibar. Exact, never fails.
pub fn tinybar_to_weibar(tinybar: u64) -> U256 {
    U256::from(tinybar) * U256::from(TINYBAR_TO_WEIBAR_COEF)
}

/// Converts a weibar amount to tinybar.
///
/// Any non-zero fractional tinybar rounds up to the smallest unit, so a
/// payment can never be truncated to zero. Values above the total supply fail.
pub fn weibar_to_tinybar(weibar: U256) -> Result<u64, UnitConversionError> {
    let (quotient, remainder) = weibar.div_rem(U256::from(TINYBAR_TO_WEIBAR_COEF));
    let mut tinybar = quotient;
    if !remainder.is_zero() {
        tinybar += U256::from(1);
    }
    if tinybar > U256::from(TOTAL_SUPPLY_TINYBARS) {
        return Err(UnitConversionError::ValueOutOfRange(weibar))
    }
    // bounded by the supply check above
    Ok(tinybar.to::<u64>())
}

/// Parses a `0x`-prefixed weibar quantity and converts it to tinybar.
pub fn weibar_hex_to_tinybar(hex: &str) -> Result<u64, UnitConversionError> {
    let digits = hex
        .strip_prefix("0x")
        .filter(|d| !d.is_empty())
        .ok_or_else(|| UnitConversionError::InvalidQuantity(hex.to_owned()))?;
    let weibar = U256::from_str_radix(digits, 16)
        .map_err(|_| UnitConversionError::InvalidQuantity(hex.to_owned()))?;
    weibar_to_tinybar(weibar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn conversion_is_exact() {
        assert_eq!(tinybar_to_weibar(1), U256::from(10_000_000_000u64));
        assert_eq!(weibar_to_tinybar(U256::from(10_000_000_000u64)).unwrap(), 1);
        assert_eq!(weibar_to_tinybar(U256::ZERO).unwrap(), 0);

        let supply_weibar = tinybar_to_weibar(TOTAL_SUPPLY_TINYBARS);
        assert_eq!(weibar_to_tinybar(supply_weibar).unwrap(), TOTAL_SUPPLY_TINYBARS);
    }

    #[test]
    fn fractional_weibar_rounds_up() {
        assert_eq!(weibar_hex_to_tinybar("0x5").unwrap(), 1);
        assert_eq!(weibar_to_tinybar(U256::from(10_000_000_001u64)).unwrap(), 2);
    }

    #[test]
    fn above_total_supply_fails() {
        let too_much = tinybar_to_weibar(TOTAL_SUPPLY_TINYBARS) + U256::from(1);
        assert_matches!(
            weibar_to_tinybar(too_much),
            Err(UnitConversionError::ValueOutOfRange(_))
        );
    }

    #[test]
    fn invalid_quantities_rejected() {
        assert_matches!(
            weibar_hex_to_tinybar("5"),
            Err(UnitConversionError::InvalidQuantity(_))
        );
        assert_matches!(
            weibar_hex_to_tinybar("0x"),
            Err(UnitConversionError::InvalidQuantity(_))
        );
        assert_matches!(
            weibar_hex_to_tinybar("0xzz"),
            Err(UnitConversionError::InvalidQuantity(_))
        );
    }
}
