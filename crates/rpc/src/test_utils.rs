//! Shared fixtures for the namespace tests: programmable mirror and consensus
//! mocks, a deterministic signer and a fully wired harness.

use crate::{debug::DebugRelay, eth::EthRelay};
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_cache::{LocalCache, SharedCache};
use relay_config::RelayConfig;
use relay_consensus::{
    ClientSupervisor, ConsensusClient, ConsensusError, EthereumTransactionRequest, FeeAccountant,
    FileInfo, FileStager, Status, SupervisorConfig, TransactionRecord, TransactionResponse,
};
use relay_hbar_limiter::{HbarLimiter, LimiterBudget, SpendingPlanRegistry};
use relay_mirror::{
    AccountBalance, AccountInfo, BlockResponse, ContractAction, ContractInfo, ContractResult,
    ContractStateEntry, ExchangeRateResponse, LogEntry, MirrorClient, MirrorResult, NetworkFee,
    NetworkFeesResponse, OpcodesResponse, TimestampRange, TokenInfo, TransactionDetail,
};
use relay_pool::{PendingPool, SenderLockRegistry};
use relay_primitives::{
    transaction::{Signature, Transaction},
    Address, EntityId, MirrorTimestamp, RequestContext, SignedTransaction, U256,
};
use secp256k1::{Message, SecretKey, SECP256K1};
use std::{collections::HashMap, sync::Arc, time::Duration};

pub(crate) fn ctx() -> RequestContext {
    RequestContext::new("req-test".into(), Some("203.0.113.9".parse().unwrap()))
}

/// Signs `transaction` with `key`, producing a decodable envelope.
pub(crate) fn sign_transaction(transaction: Transaction, key: &SecretKey) -> SignedTransaction {
    let digest = transaction.signature_hash();
    let message = Message::from_digest(digest.0);
    let signature = SECP256K1.sign_ecdsa_recoverable(&message, key);
    let (recovery_id, compact) = signature.serialize_compact();

    SignedTransaction::new(
        transaction,
        Signature {
            r: U256::from_be_slice(&compact[..32]),
            s: U256::from_be_slice(&compact[32..]),
            odd_y_parity: recovery_id.to_i32() == 1,
        },
    )
}

/// A deterministic test key.
pub(crate) fn test_key(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed; 32]).expect("valid key material")
}

/// The address `key` signs for.
pub(crate) fn key_address(key: &SecretKey) -> Address {
    let public = key.public_key(SECP256K1);
    let digest = relay_primitives::keccak256(&public.serialize_uncompressed()[1..]);
    Address::from_slice(&digest[12..])
}

/// Programmable in-memory mirror node.
#[derive(Debug, Default)]
pub(crate) struct MockMirror {
    pub blocks: Mutex<HashMap<String, BlockResponse>>,
    pub latest: Mutex<Option<BlockResponse>>,
    pub contract_results: Mutex<HashMap<String, ContractResult>>,
    /// Per-key countdown of 404 answers before the stored result appears.
    pub pending_polls: Mutex<HashMap<String, u32>>,
    pub actions: Mutex<HashMap<String, Vec<ContractAction>>>,
    pub opcodes: Mutex<HashMap<String, OpcodesResponse>>,
    pub logs_by_hash: Mutex<HashMap<String, Vec<LogEntry>>>,
    pub range_results: Mutex<Vec<ContractResult>>,
    pub range_logs: Mutex<Vec<LogEntry>>,
    pub contracts: Mutex<HashMap<String, ContractInfo>>,
    pub accounts: Mutex<HashMap<String, AccountInfo>>,
    pub balances: Mutex<HashMap<String, i64>>,
    pub states: Mutex<HashMap<String, Vec<ContractStateEntry>>>,
    pub gas_tinybars: Mutex<Option<u64>>,
    /// Every id the actions endpoint was queried for.
    pub action_calls: Mutex<Vec<String>>,
}

impl MockMirror {
    pub(crate) fn with_account(&self, address: Address, nonce: u64, balance_tinybar: i64) {
        self.accounts.lock().insert(
            format!("{address:?}").to_lowercase(),
            AccountInfo {
                account: "0.0.1001".into(),
                evm_address: Some(format!("{address:?}")),
                ethereum_nonce: nonce,
                balance: AccountBalance { balance: balance_tinybar, timestamp: None },
                deleted: false,
            },
        );
    }

    pub(crate) fn with_contract_result(&self, key: &str, result: ContractResult) {
        self.contract_results.lock().insert(key.to_owned(), result);
    }
}

/// A minimal successful contract result.
pub(crate) fn contract_result(hash: &str, from: &str) -> ContractResult {
    ContractResult {
        address: None,
        amount: Some(0),
        block_hash: Some(format!("0x{}", "12".repeat(48))),
        block_number: Some(7),
        call_result: Some("0x".into()),
        contract_id: Some("0.0.5001".into()),
        error_message: None,
        from: from.to_owned(),
        function_parameters: Some("0x".into()),
        gas_limit: 400_000,
        gas_used: Some(21_000),
        gas_price: None,
        hash: hash.to_owned(),
        nonce: Some(0),
        result: "SUCCESS".into(),
        timestamp: MirrorTimestamp::new(1_700_000_000, 0),
        to: Some("0x0000000000000000000000000000000000000acc".into()),
        transaction_index: Some(0),
        tx_type: Some(2),
        chain_id: None,
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        v: None,
        r: None,
        s: None,
    }
}

pub(crate) fn block_response(number: u64, count: u64) -> BlockResponse {
    BlockResponse {
        count,
        hash: format!("0x{}", "ab".repeat(48)),
        number,
        previous_hash: format!("0x{}", "cd".repeat(48)),
        timestamp: TimestampRange {
            from: MirrorTimestamp::new(1_700_000_000, 0),
            to: Some(MirrorTimestamp::new(1_700_000_002, 0)),
        },
        gas_used: 21_000,
        logs_bloom: None,
        size: Some(512),
    }
}

#[async_trait]
impl MirrorClient for MockMirror {
    async fn block_by_ref(&self, block_ref: &str) -> MirrorResult<Option<BlockResponse>> {
        Ok(self.blocks.lock().get(block_ref).cloned())
    }

    async fn latest_block(&self) -> MirrorResult<Option<BlockResponse>> {
        Ok(self.latest.lock().clone())
    }

    async fn contract_result(&self, id: &str) -> MirrorResult<Option<ContractResult>> {
        let mut pending = self.pending_polls.lock();
        if let Some(remaining) = pending.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None)
            }
        }
        drop(pending);
        Ok(self.contract_results.lock().get(id).cloned())
    }

    async fn contract_result_actions(
        &self,
        id: &str,
    ) -> MirrorResult<Option<Vec<ContractAction>>> {
        self.action_calls.lock().push(id.to_owned());
        Ok(self.actions.lock().get(id).cloned())
    }

    async fn contract_result_opcodes(
        &self,
        id: &str,
        _memory: bool,
        _stack: bool,
        _storage: bool,
    ) -> MirrorResult<Option<OpcodesResponse>> {
        Ok(self.opcodes.lock().get(id).cloned())
    }

    async fn contract_results_in_range(
        &self,
        _from: MirrorTimestamp,
        _to: MirrorTimestamp,
    ) -> MirrorResult<Vec<ContractResult>> {
        Ok(self.range_results.lock().clone())
    }

    async fn logs_by_transaction_hash(&self, hash: &str) -> MirrorResult<Vec<LogEntry>> {
        Ok(self.logs_by_hash.lock().get(hash).cloned().unwrap_or_default())
    }

    async fn logs_in_range(
        &self,
        _from: MirrorTimestamp,
        _to: MirrorTimestamp,
    ) -> MirrorResult<Vec<LogEntry>> {
        Ok(self.range_logs.lock().clone())
    }

    async fn contract(&self, address: &str) -> MirrorResult<Option<ContractInfo>> {
        Ok(self.contracts.lock().get(&address.to_lowercase()).cloned())
    }

    async fn account(&self, address: &str) -> MirrorResult<Option<AccountInfo>> {
        let key = address.split('?').next().unwrap_or(address).to_lowercase();
        Ok(self.accounts.lock().get(&key).cloned())
    }

    async fn balance_at(
        &self,
        address: &str,
        _at: Option<MirrorTimestamp>,
    ) -> MirrorResult<Option<i64>> {
        Ok(self.balances.lock().get(&address.to_lowercase()).copied())
    }

    async fn contract_state_at(
        &self,
        address: &str,
        _at: MirrorTimestamp,
    ) -> MirrorResult<Vec<ContractStateEntry>> {
        Ok(self.states.lock().get(&address.to_lowercase()).cloned().unwrap_or_default())
    }

    async fn network_fees(&self) -> MirrorResult<Option<NetworkFeesResponse>> {
        let gas = self.gas_tinybars.lock().unwrap_or(71);
        Ok(Some(NetworkFeesResponse {
            fees: vec![NetworkFee { gas, transaction_type: "EthereumTransaction".into() }],
            timestamp: None,
        }))
    }

    async fn exchange_rate(&self) -> MirrorResult<Option<ExchangeRateResponse>> {
        Ok(None)
    }

    async fn token(&self, _id: &str) -> MirrorResult<Option<TokenInfo>> {
        Ok(None)
    }

    async fn transaction_by_id(&self, _id: &str) -> MirrorResult<Option<TransactionDetail>> {
        Ok(None)
    }
}

/// Programmable in-memory consensus node.
#[derive(Debug)]
pub(crate) struct MockConsensus {
    /// Queued responses, popped per submission; empty queue yields success.
    pub responses: Mutex<Vec<Result<TransactionResponse, ConsensusError>>>,
    /// Every submitted request, in order.
    pub executed: Mutex<Vec<EthereumTransactionRequest>>,
    /// Artificial submission latency.
    pub delay: Option<Duration>,
    pub record_fee: i64,
}

impl Default for MockConsensus {
    fn default() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            delay: None,
            record_fee: 100,
        }
    }
}

impl MockConsensus {
    pub(crate) fn ok_response() -> TransactionResponse {
        TransactionResponse {
            transaction_id: "0.0.902@1684375868.230217103".into(),
            node_id: Some(EntityId::from_num(3)),
        }
    }

    /// Nonces of the submitted envelopes, in submission order.
    pub(crate) fn submitted_nonces(&self) -> Vec<u64> {
        self.executed
            .lock()
            .iter()
            .filter_map(|request| SignedTransaction::decode(&request.rlp_bytes).ok())
            .map(|tx| tx.nonce())
            .collect()
    }
}

#[async_trait]
impl ConsensusClient for MockConsensus {
    async fn execute_ethereum_transaction(
        &self,
        request: &EthereumTransactionRequest,
    ) -> Result<TransactionResponse, ConsensusError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.executed.lock().push(request.clone());
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            Ok(Self::ok_response())
        } else {
            responses.remove(0)
        }
    }

    async fn create_file(
        &self,
        _contents: &[u8],
    ) -> Result<(EntityId, TransactionResponse), ConsensusError> {
        Ok((EntityId::from_num(777), Self::ok_response()))
    }

    async fn append_file(
        &self,
        _file_id: EntityId,
        _contents: &[u8],
    ) -> Result<TransactionResponse, ConsensusError> {
        Ok(Self::ok_response())
    }

    async fn delete_file(
        &self,
        _file_id: EntityId,
    ) -> Result<TransactionResponse, ConsensusError> {
        Ok(Self::ok_response())
    }

    async fn file_info(&self, file_id: EntityId) -> Result<FileInfo, ConsensusError> {
        // the harness stages 4-byte call data in a single chunk
        Ok(FileInfo { file_id, size: 4, deleted: false })
    }

    async fn transaction_record(
        &self,
        transaction_id: &str,
    ) -> Result<TransactionRecord, ConsensusError> {
        Ok(TransactionRecord {
            transaction_id: transaction_id.to_owned(),
            status: Status::SUCCESS,
            transaction_fee: self.record_fee,
            gas_used: 21_000,
        })
    }
}

/// A fully wired relay over the mocks.
pub(crate) struct Harness {
    pub mirror: Arc<MockMirror>,
    pub consensus: Arc<MockConsensus>,
    pub cache: SharedCache,
    pub eth: EthRelay,
    pub debug: DebugRelay,
}

pub(crate) fn harness(config: RelayConfig) -> Harness {
    harness_with(config, MockMirror::default(), MockConsensus::default(), LimiterBudget::default())
}

pub(crate) fn harness_with(
    config: RelayConfig,
    mirror: MockMirror,
    consensus: MockConsensus,
    budget: LimiterBudget,
) -> Harness {
    let mirror = Arc::new(mirror);
    let consensus = Arc::new(consensus);
    let cache: SharedCache = Arc::new(LocalCache::default());

    let plan_registry = SpendingPlanRegistry::new(cache.clone());
    let limiter = Arc::new(HbarLimiter::new(
        cache.clone(),
        plan_registry,
        budget,
        config.hbar_rate_limit_duration,
    ));
    let supervisor = Arc::new(ClientSupervisor::new(
        Box::new({
            let consensus = consensus.clone();
            move || consensus.clone()
        }),
        SupervisorConfig {
            transaction_reset: config.hapi_client_transaction_reset,
            duration_reset: config.hapi_client_duration_reset,
            error_reset: config.hapi_client_error_reset.clone(),
        },
    ));
    let fees = Arc::new(FeeAccountant::new(limiter.clone(), None));
    let stager = Arc::new(FileStager::new(
        supervisor.clone(),
        limiter.clone(),
        fees.clone(),
        config.file_append_chunk_size,
        config.file_append_max_chunks,
    ));
    let pool = Arc::new(PendingPool::new(config.enable_tx_pool));
    let locks = Arc::new(SenderLockRegistry::default());

    let eth = EthRelay::new(
        config.clone(),
        mirror.clone(),
        cache.clone(),
        pool,
        locks,
        supervisor,
        limiter,
        fees,
        stager,
    );
    let debug = DebugRelay::new(config, mirror.clone(), cache.clone());

    Harness { mirror, consensus, cache, eth, debug }
}

/// A config tuned for fast tests: sync processing, millisecond polls.
pub(crate) fn test_config() -> RelayConfig {
    RelayConfig {
        use_async_tx_processing: false,
        mirror_poll_interval: Duration::from_millis(1),
        mirror_poll_retries: 3,
        debug_api_enabled: true,
        opcode_logger_enabled: true,
        txpool_api_enabled: true,
        gas_price_tinybars: Some(71),
        ..RelayConfig::default()
    }
}
