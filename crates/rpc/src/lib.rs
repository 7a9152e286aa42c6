//! JSON-RPC surface of the relay.
//!
//! The namespaces (`eth_*`, `net_*`, `web3_*`, `debug_*`, `txpool_*`)
//! translate Ethereum-shaped calls into mirror-node reads and consensus-node
//! submissions. Every method goes through the central [`MethodRegistry`],
//! which owns parameter validation, memoization and the error contract;
//! [`build_relay`] wires the full dependency graph from a configuration and
//! the two backend clients.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

pub mod debug;
mod error;
pub mod eth;
mod net;
mod params;
mod registry;
mod server;
#[cfg(test)]
mod test_utils;
mod txpool;
mod web3;

pub use error::{RpcError, RpcResult};
pub use registry::{MethodEntry, MethodHandler, MethodRegistry, ParamKind, ParamSpec};
pub use server::rpc_module;

use relay_cache::SharedCache;
use relay_config::{RelayConfig, SpendingPlansSource};
use relay_consensus::{
    ClientSupervisor, ConsensusClientFactory, FeeAccountant, FileStager, SupervisorConfig,
};
use relay_hbar_limiter::{parse_plans, HbarLimiter, LimiterBudget, PlanConfigError,
    SpendingPlanRegistry};
use relay_mirror::MirrorClient;
use relay_pool::{PendingPool, SenderLockRegistry};
use std::sync::Arc;
use tracing::info;

/// Errors produced while wiring the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayBuildError {
    /// The spending-plan configuration failed to load.
    #[error(transparent)]
    Plans(#[from] PlanConfigError),
}

/// Builds the fully wired method registry.
///
/// Construction follows the dependency order cache → spending-plan registry →
/// limiter → lock registry → supervisor → transaction service → dispatch;
/// everything downstream holds its collaborators behind [`Arc`]s.
pub fn build_relay(
    config: RelayConfig,
    mirror: Arc<dyn MirrorClient>,
    consensus: ConsensusClientFactory,
    cache: SharedCache,
) -> Result<MethodRegistry, RelayBuildError> {
    let plan_registry = SpendingPlanRegistry::new(cache.clone());
    let plans = match &config.hbar_spending_plans {
        SpendingPlansSource::None => Vec::new(),
        SpendingPlansSource::Inline(json) => parse_plans(json)?,
        SpendingPlansSource::File(path) => {
            let json = std::fs::read_to_string(path).map_err(|source| {
                PlanConfigError::Io { path: path.clone(), source }
            })?;
            parse_plans(&json)?
        }
    };
    plan_registry.populate_preconfigured_plans(&plans);

    let limiter = Arc::new(HbarLimiter::new(
        cache.clone(),
        plan_registry,
        LimiterBudget::default(),
        config.hbar_rate_limit_duration,
    ));

    let supervisor = Arc::new(ClientSupervisor::new(
        consensus,
        SupervisorConfig {
            transaction_reset: config.hapi_client_transaction_reset,
            duration_reset: config.hapi_client_duration_reset,
            error_reset: config.hapi_client_error_reset.clone(),
        },
    ));
    let fees = Arc::new(FeeAccountant::new(limiter.clone(), Some(mirror.clone())));
    let stager = Arc::new(FileStager::new(
        supervisor.clone(),
        limiter.clone(),
        fees.clone(),
        config.file_append_chunk_size,
        config.file_append_max_chunks,
    ));

    let pool = Arc::new(PendingPool::new(config.enable_tx_pool));
    let locks = Arc::new(SenderLockRegistry::default());

    let eth = eth::EthRelay::new(
        config.clone(),
        mirror.clone(),
        cache.clone(),
        pool.clone(),
        locks,
        supervisor,
        limiter,
        fees,
        stager,
    );
    let debug = debug::DebugRelay::new(config.clone(), mirror, cache.clone());

    let mut registry = MethodRegistry::new(cache);
    eth::register(&mut registry, eth);
    debug::register(&mut registry, debug);
    net::register(&mut registry, config.chain_id);
    web3::register(&mut registry);
    txpool::register(&mut registry, config.txpool_api_enabled.then_some(pool));

    info!(
        target: "rpc",
        chain_id = config.chain_id,
        read_only = config.read_only,
        methods = registry.method_names().count(),
        "relay registry assembled"
    );
    Ok(registry)
}
