use crate::{ConsensusClient, TransactionResponse};
use metrics::{counter, histogram};
use relay_hbar_limiter::HbarLimiter;
use relay_mirror::MirrorClient;
use std::sync::Arc;
use tracing::{debug, warn};

/// Price of a `TransactionRecordQuery`, in thousandths of a cent.
///
/// Charged to the operator whenever the record is fetched from the consensus
/// node instead of the mirror node.
const RECORD_QUERY_COST_MILLICENTS: u64 = 10;

/// Tinybar per HBAR.
const TINYBARS_PER_HBAR: u64 = 100_000_000;

/// Settles the HBAR cost of committed consensus operations.
///
/// After every submission the accountant fetches the fee-bearing record —
/// from the mirror node when one is configured, falling back to a consensus
/// `TransactionRecordQuery` — and reports the spend to the budget limiter.
/// The record query itself costs HBAR, so that charge is added on the
/// fallback path.
#[derive(Debug)]
pub struct FeeAccountant {
    limiter: Arc<HbarLimiter>,
    mirror: Option<Arc<dyn MirrorClient>>,
}

// === impl FeeAccountant ===

impl FeeAccountant {
    /// Creates an accountant reporting into `limiter`; pass a mirror client to
    /// source records from it.
    pub fn new(limiter: Arc<HbarLimiter>, mirror: Option<Arc<dyn MirrorClient>>) -> Self {
        Self { limiter, mirror }
    }

    /// Fetches the record of `response` and charges its cost.
    ///
    /// Failures are logged and swallowed: the submission already happened, so
    /// missing fee data must not fail the caller — it only loosens the budget.
    pub async fn settle(
        &self,
        client: &dyn ConsensusClient,
        response: &TransactionResponse,
        tx_constructor: &str,
        sender: Option<&str>,
        ctx: &relay_primitives::RequestContext,
    ) {
        if !response.has_transaction_id() {
            return
        }

        let (fee, gas_used) = match self.fetch_fee(client, &response.transaction_id).await {
            Ok(parts) => parts,
            Err(err) => {
                warn!(
                    target: "hapi_client",
                    %ctx, transaction_id = %response.transaction_id, %err,
                    "failed to fetch transaction record for fee accounting"
                );
                counter!("relay_fee_lookup_failures_total").increment(1);
                return
            }
        };

        debug!(
            target: "hapi_client",
            %ctx, transaction_id = %response.transaction_id, fee, gas_used, %tx_constructor,
            "transaction executed"
        );
        histogram!("relay_consensus_transaction_fee_tinybars", "constructor" => tx_constructor.to_owned())
            .record(fee as f64);
        if gas_used > 0 {
            histogram!("relay_consensus_gas_used").record(gas_used as f64);
        }

        self.limiter.add_expense(fee, sender, tx_constructor, ctx);
    }

    /// Returns `(total fee in tinybar, gas used)`.
    async fn fetch_fee(
        &self,
        client: &dyn ConsensusClient,
        transaction_id: &str,
    ) -> Result<(i64, u64), String> {
        if let Some(mirror) = &self.mirror {
            match mirror.transaction_by_id(&mirror_transaction_id(transaction_id)).await {
                Ok(Some(detail)) => return Ok((detail.charged_tx_fee, 0)),
                Ok(None) => {
                    // not yet ingested by the mirror node, fall through to the
                    // consensus node
                }
                Err(err) => return Err(err.to_string()),
            }
        }

        let record =
            client.transaction_record(transaction_id).await.map_err(|e| e.to_string())?;
        let record_charge = self.record_query_charge().await;
        Ok((record.transaction_fee.saturating_add(record_charge), record.gas_used))
    }

    /// Tinybar cost of the record query, from the current exchange rate.
    async fn record_query_charge(&self) -> i64 {
        let Some(mirror) = &self.mirror else { return 0 };
        let Ok(Some(rate)) = mirror.exchange_rate().await else { return 0 };

        let hbar = rate.current_rate.hbar_equivalent;
        let cents = rate.current_rate.cent_equivalent;
        if cents == 0 {
            return 0
        }
        // ceil(cost_millicents * hbar/cent * tinybars_per_hbar / 1000)
        let numerator = RECORD_QUERY_COST_MILLICENTS * hbar * (TINYBARS_PER_HBAR / 1000);
        (numerator.div_ceil(cents)) as i64
    }
}

/// Rewrites an SDK transaction id (`0.0.2@1700000000.123456789`) into the
/// mirror node's path form (`0.0.2-1700000000-123456789`).
pub fn mirror_transaction_id(id: &str) -> String {
    match id.split_once('@') {
        Some((payer, timestamp)) => {
            format!("{payer}-{}", timestamp.replace('.', "-"))
        }
        None => id.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_path_form() {
        assert_eq!(
            mirror_transaction_id("0.0.902@1684375868.230217103"),
            "0.0.902-1684375868-230217103"
        );
        assert_eq!(mirror_transaction_id("already-path-form"), "already-path-form");
    }
}
