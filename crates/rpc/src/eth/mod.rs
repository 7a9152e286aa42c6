//! The `eth_*` namespace.
//!
//! Read calls translate into mirror-node lookups; the single write call,
//! `eth_sendRawTransaction`, runs the submission pipeline in
//! [`transactions`]. Methods the backend cannot serve are registered as
//! unsupported so they fail with the contract error instead of silently
//! misbehaving.

pub mod block;
mod precheck;
pub mod transactions;
pub mod types;

use crate::{
    params,
    registry::{MethodEntry, MethodRegistry, ParamKind, ParamSpec},
    RpcError, RpcResult,
};
use self::block::BlockRef;
use futures::Future;
use relay_cache::{CachePolicy, SharedCache};
use relay_config::RelayConfig;
use relay_consensus::{ClientSupervisor, FeeAccountant, FileStager};
use relay_hbar_limiter::HbarLimiter;
use relay_mirror::{BlockResponse, ContractResult, MirrorClient};
use relay_pool::{PendingPool, SenderLockRegistry};
use relay_primitives::{
    constants::{EMPTY_OMMERS_HASH, RAW_BLOCK_BENEFICIARY, TINYBAR_TO_WEIBAR_COEF},
    tinybar_to_weibar, to_quantity, RequestContext, U256,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use self::types::{to_eth_hash, zero_bloom, FeeHistory, RpcBlock, RpcLog, RpcReceipt, RpcTransaction};

/// How long a fetched network gas price is reused.
const GAS_PRICE_TTL: Duration = Duration::from_secs(15);

/// Default ttl of memoized block and transaction reads.
const READ_CACHE_TTL: Duration = Duration::from_secs(3600);

/// `eth_*` namespace implementation.
///
/// Cheap to clone; all state lives behind an inner [`Arc`].
pub struct EthRelay {
    inner: Arc<EthRelayInner>,
}

impl Clone for EthRelay {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl std::fmt::Debug for EthRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthRelay").finish_non_exhaustive()
    }
}

/// All collaborators bundled together.
pub(crate) struct EthRelayInner {
    pub(crate) config: RelayConfig,
    pub(crate) mirror: Arc<dyn MirrorClient>,
    pub(crate) cache: SharedCache,
    pub(crate) pool: Arc<PendingPool>,
    pub(crate) locks: Arc<SenderLockRegistry>,
    pub(crate) supervisor: Arc<ClientSupervisor>,
    pub(crate) limiter: Arc<HbarLimiter>,
    pub(crate) fees: Arc<FeeAccountant>,
    pub(crate) stager: Arc<FileStager>,
}

// === impl EthRelay ===

impl EthRelay {
    /// Creates the namespace over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RelayConfig,
        mirror: Arc<dyn MirrorClient>,
        cache: SharedCache,
        pool: Arc<PendingPool>,
        locks: Arc<SenderLockRegistry>,
        supervisor: Arc<ClientSupervisor>,
        limiter: Arc<HbarLimiter>,
        fees: Arc<FeeAccountant>,
        stager: Arc<FileStager>,
    ) -> Self {
        Self {
            inner: Arc::new(EthRelayInner {
                config,
                mirror,
                cache,
                pool,
                locks,
                supervisor,
                limiter,
                fees,
                stager,
            }),
        }
    }

    pub(crate) fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub(crate) fn mirror(&self) -> &dyn MirrorClient {
        self.inner.mirror.as_ref()
    }

    /// Returns the pending pool.
    pub fn pool(&self) -> &PendingPool {
        &self.inner.pool
    }

    /// Returns the sender lock registry.
    pub fn locks(&self) -> &SenderLockRegistry {
        &self.inner.locks
    }

    /// The configured chain id as a quantity.
    pub fn chain_id(&self) -> String {
        to_quantity(U256::from(self.inner.config.chain_id))
    }

    /// Number of the most recent block.
    pub async fn block_number(&self) -> RpcResult<String> {
        let block = self
            .mirror()
            .latest_block()
            .await?
            .ok_or_else(|| RpcError::ResourceNotFound("latest block".to_owned()))?;
        Ok(to_quantity(U256::from(block.number)))
    }

    /// The network gas price in weibar.
    ///
    /// Sourced from the configured override or the mirror node's fee
    /// schedule; briefly cached because precheck consults it on every
    /// submission.
    pub async fn gas_price_weibar(&self) -> RpcResult<u128> {
        if let Some(tinybars) = self.inner.config.gas_price_tinybars {
            return Ok(tinybars as u128 * TINYBAR_TO_WEIBAR_COEF)
        }

        const KEY: &str = "internal:gasPrice";
        if let Some(cached) = self.inner.cache.get(KEY, "eth") {
            if let Ok(price) = cached.parse() {
                return Ok(price)
            }
        }

        let fees = self
            .mirror()
            .network_fees()
            .await?
            .ok_or_else(|| RpcError::ResourceNotFound("network fees".to_owned()))?;
        let gas_tinybars = fees
            .fees
            .iter()
            .find(|fee| fee.transaction_type == "EthereumTransaction")
            .map(|fee| fee.gas)
            .ok_or_else(|| RpcError::Internal("no EthereumTransaction fee schedule".to_owned()))?;

        let price = gas_tinybars as u128 * TINYBAR_TO_WEIBAR_COEF;
        self.inner.cache.set(KEY, price.to_string(), "eth", Some(GAS_PRICE_TTL));
        Ok(price)
    }

    async fn gas_price(&self) -> RpcResult<String> {
        Ok(to_quantity(U256::from(self.gas_price_weibar().await?)))
    }

    async fn fee_history(
        &self,
        block_count: u64,
        newest: BlockRef,
        percentiles: Option<Vec<f64>>,
    ) -> RpcResult<FeeHistory> {
        let newest = match self.resolve_block(&newest).await? {
            Some(block) => block.number,
            None => return Err(RpcError::ResourceNotFound("fee history block".to_owned())),
        };
        let count = block_count.clamp(1, 10).min(newest + 1);
        let oldest = newest + 1 - count;
        let price = to_quantity(U256::from(self.gas_price_weibar().await?));

        Ok(FeeHistory {
            base_fee_per_gas: vec![price; count as usize + 1],
            gas_used_ratio: vec![0.5; count as usize],
            oldest_block: to_quantity(U256::from(oldest)),
            reward: percentiles.map(|p| vec![vec!["0x0".to_owned(); p.len()]; count as usize]),
        })
    }

    /// Resolves a block reference against the mirror node.
    pub(crate) async fn resolve_block(
        &self,
        block: &BlockRef,
    ) -> RpcResult<Option<BlockResponse>> {
        match block.to_mirror_ref() {
            None => Ok(self.mirror().latest_block().await?),
            Some(mirror_ref) => Ok(self.mirror().block_by_ref(&mirror_ref).await?),
        }
    }

    async fn get_balance(&self, address: String) -> RpcResult<String> {
        match self.mirror().account(&address).await? {
            Some(account) => {
                let tinybar = account.balance.balance.max(0) as u64;
                Ok(to_quantity(tinybar_to_weibar(tinybar)))
            }
            None => Ok("0x0".to_owned()),
        }
    }

    async fn get_transaction_count(&self, address: String) -> RpcResult<String> {
        match self.mirror().account(&address).await? {
            Some(account) => Ok(to_quantity(U256::from(account.ethereum_nonce))),
            None => Ok("0x0".to_owned()),
        }
    }

    async fn get_code(&self, address: String) -> RpcResult<String> {
        match self.mirror().contract(&address).await? {
            Some(contract) => {
                Ok(contract.runtime_bytecode.unwrap_or_else(|| "0x".to_owned()))
            }
            None => Ok("0x".to_owned()),
        }
    }

    async fn get_storage_at(&self, address: String, slot: String) -> RpcResult<String> {
        let Some(block) = self.mirror().latest_block().await? else {
            return Ok(types::ZERO_HASH.to_owned())
        };
        let at = block.timestamp.to.unwrap_or(block.timestamp.from);
        let state = self.mirror().contract_state_at(&address, at).await?;

        let wanted = normalize_word(&slot);
        Ok(state
            .iter()
            .find(|entry| normalize_word(&entry.slot) == wanted)
            .map(|entry| entry.value.clone())
            .unwrap_or_else(|| types::ZERO_HASH.to_owned()))
    }

    async fn get_block(&self, block: BlockRef, full: bool) -> RpcResult<Value> {
        let Some(block) = self.resolve_block(&block).await? else { return Ok(Value::Null) };
        let rpc_block = self.shape_block(block, full).await?;
        Ok(serde_json::to_value(rpc_block).map_err(|e| RpcError::Internal(e.to_string()))?)
    }

    async fn shape_block(&self, block: BlockResponse, full: bool) -> RpcResult<RpcBlock> {
        let to = block.timestamp.to.unwrap_or(block.timestamp.from);
        let results = self
            .mirror()
            .contract_results_in_range(block.timestamp.from, to)
            .await?;
        let price = to_quantity(U256::from(self.gas_price_weibar().await?));

        let transactions = results
            .iter()
            // transactions that never passed precheck have no Ethereum shape
            .filter(|result| result.result != "WRONG_NONCE")
            .map(|result| {
                if full {
                    serde_json::to_value(RpcTransaction::from_contract_result(result, &price))
                        .map_err(|e| RpcError::Internal(e.to_string()))
                } else {
                    Ok(Value::String(result.hash.clone()))
                }
            })
            .collect::<RpcResult<Vec<_>>>()?;

        Ok(RpcBlock {
            number: to_quantity(U256::from(block.number)),
            hash: to_eth_hash(&block.hash),
            parent_hash: to_eth_hash(&block.previous_hash),
            sha3_uncles: format!("0x{}", alloy_primitives::hex::encode(EMPTY_OMMERS_HASH)),
            nonce: "0x0000000000000000".to_owned(),
            mix_hash: types::ZERO_HASH.to_owned(),
            logs_bloom: block.logs_bloom.unwrap_or_else(zero_bloom),
            transactions_root: types::ZERO_HASH.to_owned(),
            state_root: types::ZERO_HASH.to_owned(),
            receipts_root: types::ZERO_HASH.to_owned(),
            miner: format!("{RAW_BLOCK_BENEFICIARY:?}"),
            difficulty: "0x0".to_owned(),
            total_difficulty: "0x0".to_owned(),
            extra_data: "0x".to_owned(),
            size: to_quantity(U256::from(block.size.unwrap_or(0))),
            gas_limit: to_quantity(U256::from(self.inner.config.max_gas_limit)),
            gas_used: to_quantity(U256::from(block.gas_used)),
            timestamp: to_quantity(U256::from(block.timestamp.from.seconds)),
            base_fee_per_gas: Some(price),
            uncles: vec![],
            transactions,
        })
    }

    async fn get_transaction_by_hash(&self, hash: String) -> RpcResult<Value> {
        match self.mirror().contract_result(&hash).await? {
            Some(result) => {
                let price = to_quantity(U256::from(self.gas_price_weibar().await?));
                serde_json::to_value(RpcTransaction::from_contract_result(&result, &price))
                    .map_err(|e| RpcError::Internal(e.to_string()))
            }
            None => Ok(Value::Null),
        }
    }

    async fn get_transaction_receipt(&self, hash: String) -> RpcResult<Value> {
        let Some(result) = self.mirror().contract_result(&hash).await? else {
            return Ok(Value::Null)
        };
        let logs = self.mirror().logs_by_transaction_hash(&hash).await?;
        let price = to_quantity(U256::from(self.gas_price_weibar().await?));

        let receipt = shape_receipt(&result, &logs, &price);
        serde_json::to_value(receipt).map_err(|e| RpcError::Internal(e.to_string()))
    }

    async fn get_logs(&self, filter: Value) -> RpcResult<Value> {
        let from = filter
            .get("fromBlock")
            .map(BlockRef::parse)
            .transpose()?
            .unwrap_or(BlockRef::Latest);
        let to = filter
            .get("toBlock")
            .map(BlockRef::parse)
            .transpose()?
            .unwrap_or(BlockRef::Latest);

        let Some(from_block) = self.resolve_block(&from).await? else {
            return Ok(json!([]))
        };
        let Some(to_block) = self.resolve_block(&to).await? else { return Ok(json!([])) };
        let range_end = to_block.timestamp.to.unwrap_or(to_block.timestamp.from);

        let logs = self.mirror().logs_in_range(from_block.timestamp.from, range_end).await?;

        let addresses: Vec<String> = match filter.get("address") {
            Some(Value::String(a)) => vec![a.to_lowercase()],
            Some(Value::Array(list)) => list
                .iter()
                .filter_map(|a| a.as_str())
                .map(|a| a.to_lowercase())
                .collect(),
            _ => vec![],
        };
        let topic0: Option<Vec<String>> = match filter.get("topics").and_then(|t| t.get(0)) {
            Some(Value::String(t)) => Some(vec![t.to_lowercase()]),
            Some(Value::Array(list)) => Some(
                list.iter().filter_map(|t| t.as_str()).map(|t| t.to_lowercase()).collect(),
            ),
            _ => None,
        };

        let shaped: Vec<RpcLog> = logs
            .iter()
            .filter(|log| {
                addresses.is_empty() || addresses.contains(&log.address.to_lowercase())
            })
            .filter(|log| match &topic0 {
                None => true,
                Some(wanted) => log
                    .topics
                    .first()
                    .map(|t| wanted.contains(&t.to_lowercase()))
                    .unwrap_or(false),
            })
            .map(RpcLog::from_log_entry)
            .collect();

        serde_json::to_value(shaped).map_err(|e| RpcError::Internal(e.to_string()))
    }
}

/// Builds an [`RpcReceipt`] from the mirror-node data.
fn shape_receipt(result: &ContractResult, logs: &[relay_mirror::LogEntry], price: &str) -> RpcReceipt {
    RpcReceipt {
        block_hash: result.block_hash.as_deref().map(to_eth_hash),
        block_number: result.block_number.map(|n| to_quantity(U256::from(n))),
        contract_address: result.to.is_none().then(|| result.address.clone()).flatten(),
        cumulative_gas_used: to_quantity(U256::from(result.gas_used.unwrap_or(0))),
        effective_gas_price: result.gas_price.clone().unwrap_or_else(|| price.to_owned()),
        from: result.from.clone(),
        gas_used: to_quantity(U256::from(result.gas_used.unwrap_or(0))),
        logs: logs.iter().map(RpcLog::from_log_entry).collect(),
        logs_bloom: zero_bloom(),
        status: if result.is_success() { "0x1" } else { "0x0" }.to_owned(),
        to: result.to.clone(),
        transaction_hash: result.hash.clone(),
        transaction_index: result.transaction_index.map(|i| to_quantity(U256::from(i))),
        tx_type: to_quantity(U256::from(result.tx_type.unwrap_or(0))),
    }
}

/// Pads or trims a hex word to 32 bytes for slot comparison.
fn normalize_word(hex: &str) -> String {
    let digits = hex.strip_prefix("0x").unwrap_or(hex).trim_start_matches('0');
    format!("{digits:0>64}")
}

fn entry<F, Fut>(
    name: &'static str,
    spec: ParamSpec,
    cache_policy: Option<CachePolicy>,
    api: EthRelay,
    f: F,
) -> MethodEntry
where
    F: Fn(EthRelay, Vec<Value>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<Value>> + Send + 'static,
{
    MethodEntry {
        name,
        params: spec,
        cache_policy,
        handler: Arc::new(move |params, ctx| Box::pin(f(api.clone(), params, ctx))),
    }
}

/// Registers the namespace.
pub fn register(registry: &mut MethodRegistry, api: EthRelay) {
    registry.register(entry(
        "eth_chainId",
        ParamSpec::none(),
        None,
        api.clone(),
        |api, _, _| async move { Ok(json!(api.chain_id())) },
    ));
    registry.register(entry(
        "eth_blockNumber",
        ParamSpec::none(),
        None,
        api.clone(),
        |api, _, _| async move { Ok(json!(api.block_number().await?)) },
    ));
    registry.register(entry(
        "eth_gasPrice",
        ParamSpec::none(),
        Some(CachePolicy::with_ttl(GAS_PRICE_TTL)),
        api.clone(),
        |api, _, _| async move { Ok(json!(api.gas_price().await?)) },
    ));
    registry.register(entry(
        "eth_maxPriorityFeePerGas",
        ParamSpec::none(),
        None,
        api.clone(),
        |_, _, _| async move { Ok(json!("0x0")) },
    ));
    registry.register(entry(
        "eth_feeHistory",
        ParamSpec::with_optional(
            2,
            vec![ParamKind::Quantity, ParamKind::BlockRef, ParamKind::Any],
        ),
        None,
        api.clone(),
        |api, params, _| async move {
            let count = params::quantity_u64(&params, 0)?;
            let newest = BlockRef::parse(&params[1])?;
            let percentiles: Option<Vec<f64>> = params::optional(&params, 2)?;
            Ok(serde_json::to_value(api.fee_history(count, newest, percentiles).await?)
                .map_err(|e| RpcError::Internal(e.to_string()))?)
        },
    ));
    registry.register(entry(
        "eth_getBalance",
        ParamSpec::with_optional(1, vec![ParamKind::Address, ParamKind::BlockRefOrHash]),
        None,
        api.clone(),
        |api, params, _| async move {
            let address: String = params::require(&params, 0)?;
            Ok(json!(api.get_balance(address).await?))
        },
    ));
    registry.register(entry(
        "eth_getTransactionCount",
        ParamSpec::with_optional(1, vec![ParamKind::Address, ParamKind::BlockRefOrHash]),
        None,
        api.clone(),
        |api, params, _| async move {
            let address: String = params::require(&params, 0)?;
            Ok(json!(api.get_transaction_count(address).await?))
        },
    ));
    registry.register(entry(
        "eth_getCode",
        ParamSpec::with_optional(1, vec![ParamKind::Address, ParamKind::BlockRefOrHash]),
        Some(CachePolicy::with_ttl(READ_CACHE_TTL).skip_block_tags(1)),
        api.clone(),
        |api, params, _| async move {
            let address: String = params::require(&params, 0)?;
            Ok(json!(api.get_code(address).await?))
        },
    ));
    registry.register(entry(
        "eth_getStorageAt",
        ParamSpec::with_optional(
            2,
            vec![ParamKind::Address, ParamKind::Quantity, ParamKind::BlockRefOrHash],
        ),
        None,
        api.clone(),
        |api, params, _| async move {
            let address: String = params::require(&params, 0)?;
            let slot: String = params::require(&params, 1)?;
            Ok(json!(api.get_storage_at(address, slot).await?))
        },
    ));
    registry.register(entry(
        "eth_getBlockByNumber",
        ParamSpec::required(vec![ParamKind::BlockRef, ParamKind::Boolean]),
        Some(CachePolicy::with_ttl(READ_CACHE_TTL).skip_block_tags(0)),
        api.clone(),
        |api, params, _| async move {
            let block = BlockRef::parse(&params[0])?;
            let full: bool = params::require(&params, 1)?;
            api.get_block(block, full).await
        },
    ));
    registry.register(entry(
        "eth_getBlockByHash",
        ParamSpec::required(vec![ParamKind::Hash, ParamKind::Boolean]),
        Some(CachePolicy::with_ttl(READ_CACHE_TTL)),
        api.clone(),
        |api, params, _| async move {
            let hash: String = params::require(&params, 0)?;
            let full: bool = params::require(&params, 1)?;
            api.get_block(BlockRef::Hash(hash), full).await
        },
    ));
    registry.register(entry(
        "eth_getTransactionByHash",
        ParamSpec::required(vec![ParamKind::Hash]),
        None,
        api.clone(),
        |api, params, _| async move {
            let hash: String = params::require(&params, 0)?;
            api.get_transaction_by_hash(hash).await
        },
    ));
    registry.register(entry(
        "eth_getTransactionReceipt",
        ParamSpec::required(vec![ParamKind::Hash]),
        None,
        api.clone(),
        |api, params, _| async move {
            let hash: String = params::require(&params, 0)?;
            api.get_transaction_receipt(hash).await
        },
    ));
    registry.register(entry(
        "eth_getLogs",
        ParamSpec::required(vec![ParamKind::Object]),
        None,
        api.clone(),
        |api, params, _| async move { api.get_logs(params[0].clone()).await },
    ));
    registry.register(entry(
        "eth_sendRawTransaction",
        ParamSpec::required(vec![ParamKind::HexData]),
        None,
        api.clone(),
        |api, params, ctx| async move {
            let raw: String = params::require(&params, 0)?;
            let bytes = params::hex_bytes(&raw)?;
            let hash = api.send_raw_transaction(bytes, &ctx).await?;
            Ok(json!(format!("{hash:?}")))
        },
    ));

    // the gateway fronts no local accounts, miner or sync process
    registry.register(entry(
        "eth_accounts",
        ParamSpec::none(),
        None,
        api.clone(),
        |_, _, _| async move { Ok(json!([])) },
    ));
    registry.register(entry(
        "eth_syncing",
        ParamSpec::none(),
        None,
        api.clone(),
        |_, _, _| async move { Ok(json!(false)) },
    ));
    registry.register(entry(
        "eth_mining",
        ParamSpec::none(),
        None,
        api.clone(),
        |_, _, _| async move { Ok(json!(false)) },
    ));
    registry.register(entry(
        "eth_hashrate",
        ParamSpec::none(),
        None,
        api.clone(),
        |_, _, _| async move { Ok(json!("0x0")) },
    ));
    registry.register(entry(
        "eth_getUncleCountByBlockHash",
        ParamSpec::required(vec![ParamKind::Hash]),
        None,
        api.clone(),
        |_, _, _| async move { Ok(json!("0x0")) },
    ));
    registry.register(entry(
        "eth_getUncleCountByBlockNumber",
        ParamSpec::required(vec![ParamKind::BlockRef]),
        None,
        api.clone(),
        |_, _, _| async move { Ok(json!("0x0")) },
    ));
    registry.register(entry(
        "eth_getUncleByBlockHashAndIndex",
        ParamSpec::required(vec![ParamKind::Hash, ParamKind::Quantity]),
        None,
        api.clone(),
        |_, _, _| async move { Ok(Value::Null) },
    ));
    registry.register(entry(
        "eth_getUncleByBlockNumberAndIndex",
        ParamSpec::required(vec![ParamKind::BlockRef, ParamKind::Quantity]),
        None,
        api,
        |_, _, _| async move { Ok(Value::Null) },
    ));

    // recognized but unservable without local execution or signing keys
    registry.register_unsupported(&[
        "eth_call",
        "eth_estimateGas",
        "eth_coinbase",
        "eth_protocolVersion",
        "eth_sign",
        "eth_signTransaction",
        "eth_sendTransaction",
        "eth_getProof",
        "eth_blobBaseFee",
        "eth_newFilter",
        "eth_newBlockFilter",
        "eth_newPendingTransactionFilter",
        "eth_uninstallFilter",
        "eth_getFilterChanges",
        "eth_getFilterLogs",
        "eth_getWork",
        "eth_submitWork",
        "eth_submitHashrate",
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        block_response, contract_result, ctx, harness_with, test_config, MockConsensus,
        MockMirror,
    };
    use alloy_primitives::address;
    use relay_consensus::NoopConsensusClient;
    use relay_hbar_limiter::LimiterBudget;
    use relay_mirror::LogEntry;
    use relay_primitives::MirrorTimestamp;
    use serde_json::json;

    #[tokio::test]
    async fn balances_and_nonces_come_from_the_account_endpoint() {
        let sender = address!("00000000000000000000000000000000000000aa");
        let mirror = MockMirror::default();
        mirror.with_account(sender, 7, 3);

        let h = harness_with(
            test_config(),
            mirror,
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        assert_eq!(h.eth.get_balance(format!("{sender:?}")).await.unwrap(), "0x6fc23ac00");
        assert_eq!(h.eth.get_transaction_count(format!("{sender:?}")).await.unwrap(), "0x7");

        // unknown accounts read as empty rather than erroring
        let unknown = "0x00000000000000000000000000000000000000bb";
        assert_eq!(h.eth.get_balance(unknown.into()).await.unwrap(), "0x0");
        assert_eq!(h.eth.get_transaction_count(unknown.into()).await.unwrap(), "0x0");
    }

    #[tokio::test]
    async fn gas_price_converts_the_fee_schedule() {
        let config = RelayConfig { gas_price_tinybars: None, ..test_config() };
        let mirror = MockMirror::default();
        *mirror.gas_tinybars.lock() = Some(71);

        let h = harness_with(config, mirror, MockConsensus::default(), LimiterBudget::default());
        // 71 tinybar/gas * 10^10 weibar/tinybar
        assert_eq!(h.eth.gas_price_weibar().await.unwrap(), 710_000_000_000);
        assert_eq!(h.eth.gas_price().await.unwrap(), "0xa54f4c3c00");
    }

    #[tokio::test]
    async fn blocks_exclude_unshaped_transactions() {
        let mirror = MockMirror::default();
        mirror.blocks.lock().insert("17".into(), block_response(17, 2));

        let good = contract_result(&format!("0x{}", "aa".repeat(32)), "0xf41");
        let mut skipped = contract_result(&format!("0x{}", "bb".repeat(32)), "0xf41");
        skipped.result = "WRONG_NONCE".into();
        mirror.range_results.lock().extend([good, skipped]);

        let h = harness_with(
            test_config(),
            mirror,
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        let block =
            h.eth.get_block(block::BlockRef::Number(17), false).await.unwrap();

        assert_eq!(block["number"], "0x11");
        // hashes are truncated to ethereum's 32 bytes
        assert_eq!(block["hash"].as_str().unwrap().len(), 66);
        let transactions = block["transactions"].as_array().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0], format!("0x{}", "aa".repeat(32)));

        let absent = h.eth.get_block(block::BlockRef::Number(99), false).await.unwrap();
        assert!(absent.is_null());
    }

    #[tokio::test]
    async fn receipts_carry_status_and_logs() {
        let hash = format!("0x{}", "aa".repeat(32));
        let mirror = MockMirror::default();
        let mut result = contract_result(&hash, "0xf41");
        result.error_message = Some("0x".into());
        result.result = "CONTRACT_REVERT_EXECUTED".into();
        mirror.with_contract_result(&hash, result);
        mirror.logs_by_hash.lock().insert(
            hash.clone(),
            vec![LogEntry {
                address: "0x0000000000000000000000000000000000163b5a".into(),
                contract_id: None,
                data: Some("0x01".into()),
                index: 0,
                topics: vec![],
                block_hash: None,
                block_number: Some(7),
                timestamp: MirrorTimestamp::new(1, 0),
                transaction_hash: hash.clone(),
                transaction_index: Some(0),
            }],
        );

        let h = harness_with(
            test_config(),
            mirror,
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        let receipt = h.eth.get_transaction_receipt(hash.clone()).await.unwrap();
        assert_eq!(receipt["status"], "0x0");
        assert_eq!(receipt["transactionHash"], hash.as_str());
        assert_eq!(receipt["logs"][0]["data"], "0x01");

        let missing = h
            .eth
            .get_transaction_receipt(format!("0x{}", "00".repeat(32)))
            .await
            .unwrap();
        assert!(missing.is_null());
    }

    #[tokio::test]
    async fn fee_history_is_synthesized() {
        let mirror = MockMirror::default();
        *mirror.latest.lock() = Some(block_response(20, 0));

        let h = harness_with(
            test_config(),
            mirror,
            MockConsensus::default(),
            LimiterBudget::default(),
        );
        let history = h
            .eth
            .fee_history(3, block::BlockRef::Latest, Some(vec![25.0, 75.0]))
            .await
            .unwrap();

        assert_eq!(history.oldest_block, "0x12");
        assert_eq!(history.base_fee_per_gas.len(), 4);
        assert_eq!(history.gas_used_ratio.len(), 3);
        assert_eq!(history.reward.unwrap()[0].len(), 2);
    }

    #[tokio::test]
    async fn full_registry_serves_the_surface() {
        let registry = crate::build_relay(
            test_config(),
            Arc::new(MockMirror::default()),
            Box::new(|| Arc::new(NoopConsensusClient)),
            Arc::new(relay_cache::LocalCache::default()),
        )
        .unwrap();

        let chain_id = registry.dispatch("eth_chainId", vec![], ctx()).await.unwrap();
        assert_eq!(chain_id, json!("0x12a"));

        let accounts = registry.dispatch("eth_accounts", vec![], ctx()).await.unwrap();
        assert_eq!(accounts, json!([]));

        let err = registry.dispatch("eth_call", vec![json!({})], ctx()).await.unwrap_err();
        assert_eq!(err.code(), -32601);

        let err = registry.dispatch("not_a_method", vec![], ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported JSON-RPC method");
    }
}
