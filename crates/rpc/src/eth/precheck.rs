//! Pre-submission validation of a raw transaction.
//!
//! Checks run in a fixed order and each failure is terminal with its own
//! error kind: chain id, gas limit cap, gas price floor (including the
//! one-tinybar value rule), sender funding, then nonce. Order matters — a
//! wallet retrying on `NONCE_TOO_LOW` must first have passed everything a
//! resubmission cannot fix.

use super::EthRelay;
use crate::{RpcError, RpcResult};
use relay_primitives::{
    constants::ONE_TINYBAR_IN_WEIBAR, tinybar_to_weibar, Address, RequestContext,
    SignedTransaction, U256,
};
use tracing::debug;

impl EthRelay {
    /// Runs the full precheck chain for `tx` from `sender`.
    pub(crate) async fn precheck(
        &self,
        tx: &SignedTransaction,
        sender: Address,
        ctx: &RequestContext,
    ) -> RpcResult<()> {
        self.check_chain_id(tx)?;
        self.check_gas_limit(tx)?;
        self.check_gas_price_and_value(tx, ctx).await?;
        self.check_funds_and_nonce(tx, sender, ctx).await
    }

    fn check_chain_id(&self, tx: &SignedTransaction) -> RpcResult<()> {
        match tx.chain_id() {
            // pre-EIP-155 payloads carry no chain id and pass
            None => Ok(()),
            Some(id) if id == self.config().chain_id => Ok(()),
            Some(id) => Err(RpcError::InvalidArguments(format!(
                "ChainId ({id:#x}) not supported. The correct chainId is {:#x}",
                self.config().chain_id
            ))),
        }
    }

    fn check_gas_limit(&self, tx: &SignedTransaction) -> RpcResult<()> {
        let cap = self.config().max_gas_limit;
        if tx.gas_limit() > cap {
            return Err(RpcError::GasLimitTooHigh { gas_limit: tx.gas_limit(), cap })
        }
        Ok(())
    }

    async fn check_gas_price_and_value(
        &self,
        tx: &SignedTransaction,
        ctx: &RequestContext,
    ) -> RpcResult<()> {
        let minimum = self.gas_price_weibar().await?;
        let offered = tx.max_gas_price();
        if offered < minimum {
            debug!(target: "rpc", %ctx, offered, minimum, "gas price below network minimum");
            return Err(RpcError::GasPriceTooLow { gas_price: offered, minimum })
        }

        let value = tx.value();
        if !value.is_zero() && value < U256::from(ONE_TINYBAR_IN_WEIBAR) {
            return Err(RpcError::ValueTooLow)
        }
        Ok(())
    }

    async fn check_funds_and_nonce(
        &self,
        tx: &SignedTransaction,
        sender: Address,
        ctx: &RequestContext,
    ) -> RpcResult<()> {
        let address = format!("{sender:?}");
        let Some(account) = self.mirror().account(&address).await? else {
            debug!(target: "rpc", %ctx, %sender, "sender account not found");
            return Err(RpcError::InsufficientFunds)
        };

        let balance = tinybar_to_weibar(account.balance.balance.max(0) as u64);
        let upfront = tx.value() +
            U256::from(tx.gas_limit()) * U256::from(tx.max_gas_price());
        if balance < upfront {
            debug!(target: "rpc", %ctx, %sender, %balance, %upfront, "insufficient funds");
            return Err(RpcError::InsufficientFunds)
        }

        if tx.nonce() < account.ethereum_nonce {
            return Err(RpcError::NonceTooLow {
                provided: tx.nonce(),
                current: account.ethereum_nonce,
            })
        }
        Ok(())
    }
}
