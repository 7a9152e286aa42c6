//! The `eth_sendRawTransaction` pipeline.
//!
//! A raw transaction travels: decode → read-only gate → precheck → sender
//! lock → pool admit → (optional) call-data staging → budget gate → consensus
//! submit → lock release → hash reconciliation → pool remove. The sender lock
//! is released the moment the consensus node accepts or rejects the
//! submission — the nonce is consumed at that point, and only reconciliation
//! work remains, which may overlap with the sender's next transaction.

use super::EthRelay;
use crate::{RpcError, RpcResult};
use metrics::counter;
use relay_consensus::{
    mirror_transaction_id, ConsensusError, EthereumTransactionRequest, TransactionResponse,
};
use relay_hbar_limiter::ExecutionMode;
use relay_mirror::ContractResult;
use relay_pool::{SenderLockRegistry, SessionToken};
use relay_primitives::{
    Address, Bytes, RequestContext, SignedTransaction, Transaction, TxHash,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Constructor name reported to the limiter and metrics.
const TX_CONSTRUCTOR: &str = "EthereumTransaction";

const METHOD: &str = "eth_sendRawTransaction";

/// Holds a sender lock until explicitly released; the drop guard covers early
/// error returns.
struct SenderLock {
    locks: Arc<SenderLockRegistry>,
    sender: Address,
    session: SessionToken,
    held: bool,
}

impl SenderLock {
    fn release(&mut self) {
        if self.held {
            self.locks.release(self.sender, self.session);
            self.held = false;
        }
    }
}

impl Drop for SenderLock {
    fn drop(&mut self) {
        self.release();
    }
}

enum SubmitError {
    /// The pipeline failed before or around the consensus call.
    Rpc(RpcError),
    /// The consensus submission itself failed.
    Consensus(ConsensusError),
}

// === impl EthRelay ===

impl EthRelay {
    /// Accepts a raw signed transaction and returns its hash.
    pub async fn send_raw_transaction(
        &self,
        raw: Vec<u8>,
        ctx: &RequestContext,
    ) -> RpcResult<TxHash> {
        counter!("relay_raw_transactions_total").increment(1);

        if raw.len() > self.config().send_raw_transaction_size_limit {
            return Err(RpcError::InvalidArguments(format!(
                "transaction size {} exceeds limit {}",
                raw.len(),
                self.config().send_raw_transaction_size_limit
            )))
        }
        let tx = SignedTransaction::decode(&raw)?;

        if self.config().read_only {
            return Err(RpcError::UnsupportedOperation("Relay is in read-only mode".to_owned()))
        }

        let sender = tx.recover_signer()?;
        debug!(target: "rpc", %ctx, %sender, nonce = tx.nonce(), hash = ?tx.hash(), "raw transaction accepted for precheck");

        self.precheck(&tx, sender, ctx).await?;

        let mut lock = if self.config().enable_nonce_ordering {
            let locks = self.locks_arc().clone();
            let token = locks.acquire(sender).await?;
            Some(SenderLock { locks, sender, session: token, held: true })
        } else {
            None
        };
        let session =
            lock.as_ref().map(|l| l.session).unwrap_or_else(SessionToken::random);

        let result = self.submit_locked(tx, sender, session, lock.as_mut(), ctx).await;
        // the guard also fires on every early error return above this point
        if let Some(lock) = lock.as_mut() {
            lock.release();
        }
        result
    }

    async fn submit_locked(
        &self,
        tx: SignedTransaction,
        sender: Address,
        session: SessionToken,
        mut lock: Option<&mut SenderLock>,
        ctx: &RequestContext,
    ) -> RpcResult<TxHash> {
        let nonce = tx.nonce();
        let local_hash = tx.hash();

        self.pool().admit(sender, tx.clone(), session)?;

        let submitted = self.stage_and_submit(&tx, sender, ctx).await;

        // the consensus node has consumed (or refused) the nonce; the next
        // same-sender submission may proceed while we reconcile
        if let Some(lock) = lock.as_deref_mut() {
            lock.release();
        }

        match submitted {
            Ok(response) => {
                let client = self.supervisor().client();
                self.fees()
                    .settle(
                        client.as_ref(),
                        &response,
                        TX_CONSTRUCTOR,
                        Some(&address_string(sender)),
                        ctx,
                    )
                    .await;
                self.reconcile(sender, nonce, local_hash, response, ctx).await
            }
            Err(SubmitError::Consensus(err)) if err.is_transient() => {
                warn!(target: "rpc", %ctx, %err, "transient consensus failure, reconciling through the mirror node");
                if self.config().use_async_tx_processing {
                    self.spawn_reconciliation(sender, nonce, local_hash, None, ctx.clone());
                    return Ok(local_hash)
                }
                let polled = self.poll_contract_result(&hash_string(local_hash), ctx).await;
                self.pool().remove_matching(sender, nonce, local_hash);
                match polled {
                    Some(found) => Ok(parse_mirror_hash(&found.hash, local_hash)),
                    None => Err(RpcError::Internal(err.to_string())),
                }
            }
            Err(SubmitError::Consensus(err)) => {
                self.pool().remove_matching(sender, nonce, local_hash);
                Err(RpcError::Internal(err.to_string()))
            }
            Err(SubmitError::Rpc(err)) => {
                self.pool().remove_matching(sender, nonce, local_hash);
                Err(err)
            }
        }
    }

    /// Stages oversized call data, consults the budget gate and submits.
    async fn stage_and_submit(
        &self,
        tx: &SignedTransaction,
        sender: Address,
        ctx: &RequestContext,
    ) -> Result<TransactionResponse, SubmitError> {
        let sender_str = address_string(sender);
        let payload = tx.encoded();

        let (rlp_bytes, call_data_file) = if payload.len() >
            self.config().file_append_chunk_size &&
            !self.config().jumbo_tx_enabled
        {
            info!(
                target: "rpc",
                %ctx, size = payload.len(), chunk = self.config().file_append_chunk_size,
                "staging oversized call data"
            );
            let file_id = self
                .stager()
                .create_file(tx.input(), Some(&sender_str), ctx)
                .await
                .map_err(|err| {
                    SubmitError::Rpc(match err {
                        relay_consensus::FileStagingError::RateLimited => {
                            RpcError::HbarRateLimitExceeded
                        }
                        other => RpcError::Internal(other.to_string()),
                    })
                })?;
            (strip_call_data(tx).encoded(), Some(file_id))
        } else {
            (payload, None)
        };

        if self.limiter().should_limit(
            ExecutionMode::Transaction,
            METHOD,
            TX_CONSTRUCTOR,
            Some(&sender_str),
            ctx,
        ) {
            return Err(SubmitError::Rpc(RpcError::HbarRateLimitExceeded))
        }

        let client = self.supervisor().client();
        let request = EthereumTransactionRequest {
            rlp_bytes,
            call_data_file,
            max_gas_allowance: self.config().max_transaction_fee_tinybars,
        };
        client.execute_ethereum_transaction(&request).await.map_err(|err| {
            if let Some(status) = err.status() {
                self.supervisor().report_error(status.code());
            }
            SubmitError::Consensus(err)
        })
    }

    /// Resolves the final hash after a successful consensus submission.
    async fn reconcile(
        &self,
        sender: Address,
        nonce: u64,
        local_hash: TxHash,
        response: TransactionResponse,
        ctx: &RequestContext,
    ) -> RpcResult<TxHash> {
        if !response.has_transaction_id() {
            // the SDK failed to attach an id; the payload may still land
            if self.config().use_async_tx_processing {
                self.spawn_reconciliation(sender, nonce, local_hash, None, ctx.clone());
                return Ok(local_hash)
            }
            self.pool().remove_matching(sender, nonce, local_hash);
            return Err(RpcError::Internal(
                "consensus node returned no transaction id".to_owned(),
            ))
        }

        if self.config().use_async_tx_processing {
            self.spawn_reconciliation(
                sender,
                nonce,
                local_hash,
                Some(response.transaction_id),
                ctx.clone(),
            );
            return Ok(local_hash)
        }

        let reference = mirror_transaction_id(&response.transaction_id);
        let polled = self.poll_contract_result(&reference, ctx).await;
        self.pool().remove_matching(sender, nonce, local_hash);
        match polled {
            Some(found) => Ok(parse_mirror_hash(&found.hash, local_hash)),
            // not ingested within the polling budget; the local hash is
            // correct by construction
            None => Ok(local_hash),
        }
    }

    /// Background reconciliation of async-mode submissions.
    fn spawn_reconciliation(
        &self,
        sender: Address,
        nonce: u64,
        local_hash: TxHash,
        transaction_id: Option<String>,
        ctx: RequestContext,
    ) {
        let api = self.clone();
        tokio::spawn(async move {
            let reference = transaction_id
                .as_deref()
                .map(mirror_transaction_id)
                .unwrap_or_else(|| hash_string(local_hash));

            match api.poll_contract_result(&reference, &ctx).await {
                Some(found) => {
                    if !found.hash.eq_ignore_ascii_case(&hash_string(local_hash)) {
                        // a mismatch means a client somewhere holds a hash the
                        // chain will never confirm; loudest signal we have
                        error!(
                            target: "rpc",
                            %ctx, local = %hash_string(local_hash), mirror = %found.hash,
                            "transaction hash mismatch detected during reconciliation"
                        );
                        counter!("relay_transactions_hash_mismatch_total").increment(1);
                    }
                }
                None => {
                    warn!(
                        target: "rpc",
                        %ctx, hash = %hash_string(local_hash),
                        "submitted transaction never appeared on the mirror node"
                    );
                }
            }
            api.pool().remove_matching(sender, nonce, local_hash);
        });
    }

    /// Polls `contracts/results/{reference}` with the configured bounded
    /// retries.
    async fn poll_contract_result(
        &self,
        reference: &str,
        ctx: &RequestContext,
    ) -> Option<ContractResult> {
        let retries = self.config().mirror_poll_retries.max(1);
        for attempt in 0..retries {
            match self.mirror().contract_result(reference).await {
                Ok(Some(result)) => return Some(result),
                Ok(None) => {
                    debug!(target: "rpc", %ctx, reference, attempt, "transaction not yet on the mirror node");
                }
                Err(err) => {
                    warn!(target: "rpc", %ctx, reference, attempt, %err, "mirror poll failed");
                }
            }
            if attempt + 1 < retries {
                tokio::time::sleep(self.config().mirror_poll_interval).await;
            }
        }
        None
    }

    fn locks_arc(&self) -> &Arc<SenderLockRegistry> {
        &self.inner.locks
    }

    fn supervisor(&self) -> &Arc<relay_consensus::ClientSupervisor> {
        &self.inner.supervisor
    }

    fn limiter(&self) -> &relay_hbar_limiter::HbarLimiter {
        &self.inner.limiter
    }

    fn fees(&self) -> &relay_consensus::FeeAccountant {
        &self.inner.fees
    }

    fn stager(&self) -> &relay_consensus::FileStager {
        &self.inner.stager
    }
}

/// Rebuilds the envelope with empty call data for file-staged submission.
fn strip_call_data(tx: &SignedTransaction) -> SignedTransaction {
    let mut stripped = tx.transaction.clone();
    match &mut stripped {
        Transaction::Legacy { input, .. } |
        Transaction::Eip2930 { input, .. } |
        Transaction::Eip1559 { input, .. } => *input = Bytes::new(),
    }
    SignedTransaction::new(stripped, tx.signature)
}

fn address_string(address: Address) -> String {
    format!("{address:?}")
}

fn hash_string(hash: TxHash) -> String {
    format!("{hash:?}")
}

/// Parses the mirror node's hash, falling back to the locally computed one on
/// malformed data.
fn parse_mirror_hash(mirror_hash: &str, local_hash: TxHash) -> TxHash {
    match mirror_hash.parse() {
        Ok(hash) => hash,
        Err(_) => {
            warn!(target: "rpc", mirror = %mirror_hash, "mirror node returned an unparseable hash");
            local_hash
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        contract_result, ctx, harness_with, key_address, sign_transaction, test_config, test_key,
        MockConsensus, MockMirror,
    };
    use assert_matches::assert_matches;
    use relay_hbar_limiter::LimiterBudget;
    use relay_primitives::{
        transaction::{AccessList, Transaction, TransactionKind},
        Bytes, U256,
    };
    use secp256k1::SecretKey;
    use std::{sync::Arc, time::Duration};

    /// One tinybar per gas over the configured 71-tinybar floor.
    const GAS_PRICE: u128 = 720_000_000_000;

    /// The mirror path form of [`MockConsensus::ok_response`]'s id.
    const MIRROR_TX_ID: &str = "0.0.902-1684375868-230217103";

    /// Builder for the test transfers; enum variants have no struct-update
    /// syntax, so overrides go through this.
    struct Transfer {
        chain_id: u64,
        nonce: u64,
        value: u64,
        gas_limit: u64,
        max_fee: u128,
        input: Bytes,
    }

    impl Default for Transfer {
        fn default() -> Self {
            Self {
                chain_id: 298,
                nonce: 0,
                value: 1_000_000_000_000,
                gas_limit: 21_000,
                max_fee: GAS_PRICE,
                input: Bytes::new(),
            }
        }
    }

    impl Transfer {
        fn build(self) -> Transaction {
            Transaction::Eip1559 {
                chain_id: self.chain_id,
                nonce: self.nonce,
                max_priority_fee_per_gas: 0,
                max_fee_per_gas: self.max_fee,
                gas_limit: self.gas_limit,
                to: TransactionKind::Call(alloy_primitives::address!(
                    "0000000000000000000000000000000000000acc"
                )),
                value: U256::from(self.value),
                input: self.input,
                access_list: AccessList::default(),
            }
        }
    }

    fn transfer(nonce: u64, value: u64) -> Transaction {
        Transfer { nonce, value, ..Default::default() }.build()
    }

    fn signed(key: &SecretKey, transaction: Transaction) -> SignedTransaction {
        sign_transaction(transaction, key)
    }

    fn funded_mirror(sender: Address) -> MockMirror {
        let mirror = MockMirror::default();
        // 10 HBAR covers value and fees of every test transfer
        mirror.with_account(sender, 0, 1_000_000_000);
        mirror
    }

    #[tokio::test]
    async fn happy_path_returns_the_mirror_hash() {
        let key = test_key(0x11);
        let sender = key_address(&key);
        let mirror = funded_mirror(sender);

        let mirror_hash = format!("0x{}", "6d".repeat(32));
        mirror.with_contract_result(
            MIRROR_TX_ID,
            contract_result(&mirror_hash, &format!("{sender:?}")),
        );

        let h = harness_with(
            test_config(),
            mirror,
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        let tx = signed(&key, transfer(0, 1_000_000_000_000));

        let hash = h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap();

        assert_eq!(format!("{hash:?}"), mirror_hash);
        assert_eq!(h.consensus.executed.lock().len(), 1);
        assert!(h.eth.pool().is_empty());
        assert_eq!(h.eth.locks().active_sessions(sender), 0);
    }

    #[tokio::test]
    async fn mirror_silence_falls_back_to_the_local_hash() {
        let key = test_key(0x12);
        let sender = key_address(&key);
        let h = harness_with(
            test_config(),
            funded_mirror(sender),
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        let tx = signed(&key, transfer(0, 1_000_000_000_000));

        let hash = h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap();
        assert_eq!(hash, tx.hash());
        assert!(h.eth.pool().is_empty());
    }

    #[tokio::test]
    async fn precheck_failures_are_terminal() {
        let key = test_key(0x13);
        let sender = key_address(&key);
        let mirror = MockMirror::default();
        mirror.with_account(sender, 5, 1_000_000_000);
        let h = harness_with(
            test_config(),
            mirror,
            MockConsensus::default(),
            LimiterBudget::default(),
        );

        // wrong chain id
        let wrong_chain =
            signed(&key, Transfer { chain_id: 1, nonce: 5, ..Default::default() }.build());
        assert_matches!(
            h.eth.send_raw_transaction(wrong_chain.encoded().to_vec(), &ctx()).await,
            Err(RpcError::InvalidArguments(_))
        );

        // over the gas cap
        let oversized = signed(
            &key,
            Transfer { gas_limit: 20_000_000, nonce: 5, ..Default::default() }.build(),
        );
        assert_matches!(
            h.eth.send_raw_transaction(oversized.encoded().to_vec(), &ctx()).await,
            Err(RpcError::GasLimitTooHigh { gas_limit: 20_000_000, cap: 15_000_000 })
        );

        // below the gas price floor
        let underpriced =
            signed(&key, Transfer { max_fee: 1_000, nonce: 5, ..Default::default() }.build());
        assert_matches!(
            h.eth.send_raw_transaction(underpriced.encoded().to_vec(), &ctx()).await,
            Err(RpcError::GasPriceTooLow { .. })
        );

        // one weibar of value cannot be represented on the backend
        let dust = signed(&key, transfer(5, 1));
        assert_matches!(
            h.eth.send_raw_transaction(dust.encoded().to_vec(), &ctx()).await,
            Err(RpcError::ValueTooLow)
        );

        // behind the account nonce
        let stale = signed(&key, transfer(4, 1_000_000_000_000));
        assert_matches!(
            h.eth.send_raw_transaction(stale.encoded().to_vec(), &ctx()).await,
            Err(RpcError::NonceTooLow { provided: 4, current: 5 })
        );

        // nothing reached the consensus node, nothing stayed behind
        assert!(h.consensus.executed.lock().is_empty());
        assert!(h.eth.pool().is_empty());
        assert_eq!(h.eth.locks().active_sessions(sender), 0);
    }

    #[tokio::test]
    async fn unknown_sender_is_insufficient_funds() {
        let key = test_key(0x14);
        let h = harness_with(
            test_config(),
            MockMirror::default(),
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        let tx = signed(&key, transfer(0, 1_000_000_000_000));
        assert_matches!(
            h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await,
            Err(RpcError::InsufficientFunds)
        );
    }

    #[tokio::test]
    async fn read_only_mode_rejects_before_any_side_effect() {
        let key = test_key(0x15);
        let sender = key_address(&key);
        let config = relay_config::RelayConfig { read_only: true, ..test_config() };
        let h = harness_with(
            config,
            funded_mirror(sender),
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        let tx = signed(&key, transfer(0, 1_000_000_000_000));

        let err = h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported operation: Relay is in read-only mode");
        assert!(h.consensus.executed.lock().is_empty());
    }

    #[tokio::test]
    async fn blob_transactions_are_rejected() {
        let h = harness_with(
            test_config(),
            MockMirror::default(),
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        assert_matches!(
            h.eth.send_raw_transaction(vec![0x03, 0xc0], &ctx()).await,
            Err(RpcError::UnsupportedTransactionType3)
        );
    }

    #[tokio::test]
    async fn exhausted_budget_blocks_the_submission() {
        let key = test_key(0x16);
        let sender = key_address(&key);
        let h = harness_with(
            test_config(),
            funded_mirror(sender),
            MockConsensus::default(),
            LimiterBudget { global: 0, ..LimiterBudget::default() },
        );
        let tx = signed(&key, transfer(0, 1_000_000_000_000));

        assert_matches!(
            h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await,
            Err(RpcError::HbarRateLimitExceeded)
        );
        assert!(h.consensus.executed.lock().is_empty());
        assert!(h.eth.pool().is_empty());
        assert_eq!(h.eth.locks().active_sessions(sender), 0);
    }

    #[tokio::test]
    async fn payload_at_the_chunk_size_stays_inline() {
        let key = test_key(0x17);
        let sender = key_address(&key);
        let tx = signed(
            &key,
            Transfer {
                input: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
                ..Default::default()
            }
            .build(),
        );
        let payload_len = tx.encoded().len();

        let config = relay_config::RelayConfig {
            file_append_chunk_size: payload_len,
            ..test_config()
        };
        let h = harness_with(
            config,
            funded_mirror(sender),
            MockConsensus::default(),
            LimiterBudget::default(),
        );

        h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap();
        let executed = h.consensus.executed.lock();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].call_data_file.is_none());
        assert_eq!(executed[0].rlp_bytes.len(), payload_len);
    }

    #[tokio::test]
    async fn oversized_payload_is_staged_as_a_file() {
        let key = test_key(0x18);
        let sender = key_address(&key);
        let tx = signed(
            &key,
            Transfer {
                input: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
                ..Default::default()
            }
            .build(),
        );
        let payload_len = tx.encoded().len();

        let config = relay_config::RelayConfig {
            file_append_chunk_size: payload_len - 1,
            ..test_config()
        };
        let h = harness_with(
            config,
            funded_mirror(sender),
            MockConsensus::default(),
            LimiterBudget::default(),
        );

        h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap();
        let executed = h.consensus.executed.lock();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].call_data_file, Some(relay_primitives::EntityId::from_num(777)));
        // the submitted envelope carries no call data anymore
        let submitted = SignedTransaction::decode(&executed[0].rlp_bytes).unwrap();
        assert!(submitted.input().is_empty());
    }

    #[tokio::test]
    async fn jumbo_mode_submits_oversized_payloads_inline() {
        let key = test_key(0x19);
        let sender = key_address(&key);
        let tx = signed(
            &key,
            Transfer {
                input: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
                ..Default::default()
            }
            .build(),
        );

        let config = relay_config::RelayConfig {
            file_append_chunk_size: 8,
            jumbo_tx_enabled: true,
            ..test_config()
        };
        let h = harness_with(
            config,
            funded_mirror(sender),
            MockConsensus::default(),
            LimiterBudget::default(),
        );

        h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap();
        assert!(h.consensus.executed.lock()[0].call_data_file.is_none());
    }

    #[tokio::test]
    async fn transient_failure_reconciles_through_the_mirror_node() {
        let key = test_key(0x1a);
        let sender = key_address(&key);
        let tx = signed(&key, transfer(0, 1_000_000_000_000));

        let mirror = funded_mirror(sender);
        // the mirror node saw the transaction even though the SDK timed out;
        // the poll goes by ethereum hash because there is no transaction id
        let local_hash = format!("{:?}", tx.hash());
        mirror.with_contract_result(&local_hash, contract_result(&local_hash, &format!("{sender:?}")));

        let consensus = MockConsensus::default();
        consensus.responses.lock().push(Err(relay_consensus::ConsensusError::Timeout));

        let h = harness_with(test_config(), mirror, consensus, LimiterBudget::default());
        let hash = h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap();
        assert_eq!(hash, tx.hash());
        assert!(h.eth.pool().is_empty());
    }

    #[tokio::test]
    async fn transient_failure_without_mirror_data_is_internal() {
        let key = test_key(0x1b);
        let sender = key_address(&key);
        let consensus = MockConsensus::default();
        consensus
            .responses
            .lock()
            .push(Err(relay_consensus::ConsensusError::ConnectionDropped));

        let h = harness_with(
            test_config(),
            funded_mirror(sender),
            consensus,
            LimiterBudget::default(),
        );
        let tx = signed(&key, transfer(0, 1_000_000_000_000));

        let err = h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "Error invoking RPC: Connection dropped");
        assert!(h.eth.pool().is_empty());
    }

    #[tokio::test]
    async fn async_mode_returns_the_local_hash_and_reconciles_in_background() {
        let key = test_key(0x1c);
        let sender = key_address(&key);
        let tx = signed(&key, transfer(0, 1_000_000_000_000));

        let mirror = funded_mirror(sender);
        mirror.with_contract_result(
            MIRROR_TX_ID,
            contract_result(&format!("{:?}", tx.hash()), &format!("{sender:?}")),
        );

        let config = relay_config::RelayConfig {
            use_async_tx_processing: true,
            ..test_config()
        };
        let h = harness_with(config, mirror, MockConsensus::default(), LimiterBudget::default());

        let hash = h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await.unwrap();
        assert_eq!(hash, tx.hash());

        // background reconciliation clears the pool entry
        for _ in 0..50 {
            if h.eth.pool().is_empty() {
                break
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(h.eth.pool().is_empty());
    }

    #[tokio::test]
    async fn same_sender_submissions_are_serialized_in_nonce_order() {
        let key = test_key(0x1d);
        let sender = key_address(&key);
        let consensus = MockConsensus { delay: Some(Duration::from_millis(20)), ..MockConsensus::default() };

        let h = Arc::new(harness_with(
            test_config(),
            funded_mirror(sender),
            consensus,
            LimiterBudget::default(),
        ));

        let first = {
            let h = h.clone();
            let tx = signed(&key, transfer(5, 1_000_000_000_000));
            tokio::spawn(async move {
                h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await
            })
        };
        // let the first submission take the sender lock
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let h = h.clone();
            let tx = signed(&key, transfer(6, 1_000_000_000_000));
            tokio::spawn(async move {
                h.eth.send_raw_transaction(tx.encoded().to_vec(), &ctx()).await
            })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(h.consensus.submitted_nonces(), vec![5, 6]);
        assert!(h.eth.pool().is_empty());
        assert_eq!(h.eth.locks().active_sessions(sender), 0);
    }

    #[test]
    fn stripping_call_data_preserves_everything_else() {
        let key = test_key(0x1e);
        let tx = signed(
            &key,
            Transfer { input: Bytes::from_static(&[1, 2, 3]), nonce: 9, ..Default::default() }
                .build(),
        );
        let stripped = strip_call_data(&tx);
        assert!(stripped.input().is_empty());
        assert_eq!(stripped.nonce(), tx.nonce());
        assert_eq!(stripped.signature, tx.signature);
        assert_ne!(stripped.hash(), tx.hash());
    }
}
