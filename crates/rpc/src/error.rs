//! The relay's externalized error contract.
//!
//! Every error leaving the rpc surface carries one of the numeric codes and
//! stable message templates below. Internal error types (mirror, consensus,
//! pool, units) are folded into this taxonomy at the boundary of the
//! namespace implementations; transport-level consensus errors keep their
//! exact message templates because callers classify on them.

use jsonrpsee::types::ErrorObjectOwned;
use relay_consensus::ConsensusError;
use relay_mirror::MirrorError;
use relay_pool::{LockTimeout, PoolError};
use relay_primitives::{transaction::TransactionParseError, UnitConversionError};

/// Result alias of every rpc handler.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors surfaced over the JSON-RPC boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// Malformed or out-of-contract parameters.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    /// The method is not part of the supported surface.
    #[error("Unsupported JSON-RPC method")]
    UnsupportedMethod,
    /// The operation is disabled in this deployment.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// EIP-4844 blob transactions are rejected.
    #[error("Blob transactions (type 3) are not supported")]
    UnsupportedTransactionType3,
    /// The transaction's gas limit exceeds the relay's cap.
    #[error("Transaction gas limit '{gas_limit}' exceeds max gas limit '{cap}'")]
    GasLimitTooHigh {
        /// Gas limit of the offending transaction.
        gas_limit: u64,
        /// The configured cap.
        cap: u64,
    },
    /// The offered gas price is below the network minimum.
    #[error("Gas price '{gas_price}' is below configured minimum gas price '{minimum}'")]
    GasPriceTooLow {
        /// Offered price, in weibar.
        gas_price: u128,
        /// Network minimum, in weibar.
        minimum: u128,
    },
    /// The transferred value is positive but below one tinybar.
    #[error("Value can't be non-zero and less than 10_000_000_000 wei which is 1 tinybar")]
    ValueTooLow,
    /// The sender cannot fund the transaction.
    #[error("Insufficient funds for transfer")]
    InsufficientFunds,
    /// The transaction's nonce is behind the sender's account nonce.
    #[error("Nonce too low. Provided nonce: {provided}, current nonce: {current}")]
    NonceTooLow {
        /// Nonce of the offending transaction.
        provided: u64,
        /// The sender's current nonce.
        current: u64,
    },
    /// A same-or-higher-priced duplicate is already pending.
    #[error("already known")]
    AlreadyKnown,
    /// The referenced entity does not exist.
    #[error("Requested resource not found. {0}")]
    ResourceNotFound(String),
    /// The caller's HBAR budget is exhausted.
    #[error("HBAR Rate limit exceeded")]
    HbarRateLimitExceeded,
    /// Anything that is not the caller's fault.
    #[error("Error invoking RPC: {0}")]
    Internal(String),
}

// === impl RpcError ===

impl RpcError {
    /// The JSON-RPC error code of this kind.
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidArguments(_) | Self::ValueTooLow => -32602,
            Self::UnsupportedMethod => -32601,
            Self::UnsupportedOperation(_) => -32007,
            Self::UnsupportedTransactionType3 => -32611,
            Self::GasLimitTooHigh { .. } => -32005,
            Self::GasPriceTooLow { .. } => -32009,
            Self::InsufficientFunds | Self::AlreadyKnown => -32000,
            Self::NonceTooLow { .. } => -32003,
            Self::ResourceNotFound(_) => -32001,
            Self::HbarRateLimitExceeded => -32606,
            Self::Internal(_) => -32603,
        }
    }

    /// Renders the error for the wire.
    pub fn into_error_object(self) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(self.code(), self.to_string(), None::<()>)
    }
}

impl From<RpcError> for ErrorObjectOwned {
    fn from(err: RpcError) -> Self {
        err.into_error_object()
    }
}

impl From<TransactionParseError> for RpcError {
    fn from(err: TransactionParseError) -> Self {
        match err {
            TransactionParseError::BlobTransactionsUnsupported => Self::UnsupportedTransactionType3,
            other => Self::InvalidArguments(other.to_string()),
        }
    }
}

impl From<MirrorError> for RpcError {
    fn from(err: MirrorError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ConsensusError> for RpcError {
    fn from(err: ConsensusError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<PoolError> for RpcError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::AlreadyKnown => Self::AlreadyKnown,
        }
    }
}

impl From<LockTimeout> for RpcError {
    fn from(_: LockTimeout) -> Self {
        Self::Internal("timed out acquiring the sender lock".to_owned())
    }
}

impl From<UnitConversionError> for RpcError {
    fn from(err: UnitConversionError) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_messages_are_stable() {
        assert_eq!(RpcError::UnsupportedMethod.code(), -32601);
        assert_eq!(RpcError::UnsupportedMethod.to_string(), "Unsupported JSON-RPC method");

        assert_eq!(
            RpcError::ValueTooLow.to_string(),
            "Value can't be non-zero and less than 10_000_000_000 wei which is 1 tinybar"
        );
        assert_eq!(RpcError::HbarRateLimitExceeded.code(), -32606);
        assert_eq!(RpcError::AlreadyKnown.to_string(), "already known");
    }

    #[test]
    fn parse_errors_map_by_kind() {
        assert_eq!(
            RpcError::from(TransactionParseError::BlobTransactionsUnsupported),
            RpcError::UnsupportedTransactionType3
        );
        assert_matches::assert_matches!(
            RpcError::from(TransactionParseError::Empty),
            RpcError::InvalidArguments(_)
        );
    }

    #[test]
    fn wire_shape() {
        let object = RpcError::UnsupportedMethod.into_error_object();
        assert_eq!(object.code(), -32601);
        assert_eq!(object.message(), "Unsupported JSON-RPC method");
    }
}
