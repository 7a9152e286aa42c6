//! The `debug_*` namespace.

mod raw_block;
mod tracer;
pub mod types;

use crate::{
    eth::block::BlockRef,
    params,
    registry::{MethodEntry, MethodRegistry, ParamKind, ParamSpec},
    RpcError, RpcResult,
};
use futures::future::join_all;
use relay_cache::SharedCache;
use relay_config::RelayConfig;
use relay_mirror::{BlockResponse, MirrorClient};
use relay_primitives::RequestContext;
use serde_json::{json, Value};
use std::{collections::HashSet, sync::Arc};
use tracing::debug;
use self::types::{BlockTraceEntry, TracerKind, TracerOptions};

/// Execution results that fail before the EVM runs; they have no actions and
/// produce an empty trace instead of a tracer call.
const PREEXECUTION_FAILURES: [&str; 2] = ["WRONG_NONCE", "MAX_GAS_LIMIT_EXCEEDED"];

/// `debug_*` namespace implementation.
pub struct DebugRelay {
    inner: Arc<DebugRelayInner>,
}

impl Clone for DebugRelay {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl std::fmt::Debug for DebugRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugRelay").finish_non_exhaustive()
    }
}

struct DebugRelayInner {
    config: RelayConfig,
    mirror: Arc<dyn MirrorClient>,
    cache: SharedCache,
}

// === impl DebugRelay ===

impl DebugRelay {
    /// Creates the namespace over its collaborators.
    pub fn new(config: RelayConfig, mirror: Arc<dyn MirrorClient>, cache: SharedCache) -> Self {
        Self { inner: Arc::new(DebugRelayInner { config, mirror, cache }) }
    }

    pub(crate) fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub(crate) fn mirror(&self) -> &dyn MirrorClient {
        self.inner.mirror.as_ref()
    }

    pub(crate) fn cache(&self) -> &SharedCache {
        &self.inner.cache
    }

    /// `debug_traceTransaction`.
    pub async fn trace_transaction(
        &self,
        tx_id: &str,
        options: &TracerOptions,
        ctx: &RequestContext,
    ) -> RpcResult<Value> {
        match options.kind()? {
            TracerKind::CallTracer => {
                self.call_tracer(tx_id, options.tracer_config, ctx).await
            }
            TracerKind::PrestateTracer => {
                self.prestate_tracer(tx_id, options.tracer_config, ctx).await
            }
            TracerKind::OpcodeLogger => {
                if !self.config().opcode_logger_enabled {
                    return Err(RpcError::UnsupportedOperation(
                        "opcodeLogger is disabled".to_owned(),
                    ))
                }
                self.opcode_logger(
                    tx_id,
                    options.enable_memory,
                    !options.disable_stack,
                    !options.disable_storage,
                    ctx,
                )
                .await
            }
        }
    }

    /// `debug_traceBlockByNumber`.
    ///
    /// The traced universe is the union of the block's contract results and
    /// the transactions behind its logs (which picks up synthetic transfers),
    /// deduplicated in first-seen order. Pre-execution failures short-circuit
    /// to an empty trace without touching the actions endpoint.
    pub async fn trace_block_by_number(
        &self,
        block: BlockRef,
        options: &TracerOptions,
        ctx: &RequestContext,
    ) -> RpcResult<Value> {
        // resolve the tracer up front so a bad selection fails fast
        let _ = options.kind()?;

        let Some(block) = self.resolve_block(&block).await? else {
            return Err(RpcError::ResourceNotFound("block".to_owned()))
        };
        if block.count == 0 {
            return Ok(json!([]))
        }

        let to = block.timestamp.to.unwrap_or(block.timestamp.from);
        let (results, logs) = futures::try_join!(
            self.mirror().contract_results_in_range(block.timestamp.from, to),
            self.mirror().logs_in_range(block.timestamp.from, to),
        )?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut planned: Vec<(String, Option<crate::debug::types::CallFrame>)> = Vec::new();
        for result in &results {
            if !seen.insert(result.hash.to_lowercase()) {
                continue
            }
            if PREEXECUTION_FAILURES.contains(&result.result.as_str()) {
                planned.push((result.hash.clone(), Some(tracer::failed_result_frame(result))));
            } else {
                planned.push((result.hash.clone(), None));
            }
        }
        for log in &logs {
            if seen.insert(log.transaction_hash.to_lowercase()) {
                planned.push((log.transaction_hash.clone(), None));
            }
        }
        debug!(target: "debug", %ctx, block = block.number, transactions = planned.len(), "tracing block");

        let traces = join_all(planned.into_iter().map(|(hash, empty)| async move {
            let result = match empty {
                Some(frame) => serde_json::to_value(frame)
                    .map_err(|err| RpcError::Internal(err.to_string())),
                None => self.trace_transaction(&hash, options, ctx).await,
            };
            result.map(|result| BlockTraceEntry { tx_hash: hash, result })
        }))
        .await;

        let entries = traces.into_iter().collect::<RpcResult<Vec<_>>>()?;
        serde_json::to_value(entries).map_err(|err| RpcError::Internal(err.to_string()))
    }

    pub(crate) async fn resolve_block(
        &self,
        block: &BlockRef,
    ) -> RpcResult<Option<BlockResponse>> {
        match block.to_mirror_ref() {
            None => Ok(self.mirror().latest_block().await?),
            Some(mirror_ref) => Ok(self.mirror().block_by_ref(&mirror_ref).await?),
        }
    }
}

fn entry<F, Fut>(name: &'static str, spec: ParamSpec, api: DebugRelay, f: F) -> MethodEntry
where
    F: Fn(DebugRelay, Vec<Value>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = RpcResult<Value>> + Send + 'static,
{
    MethodEntry {
        name,
        params: spec,
        cache_policy: None,
        handler: Arc::new(move |params, ctx| Box::pin(f(api.clone(), params, ctx))),
    }
}

/// Registers the namespace; when the debug api is disabled the methods stay
/// registered but answer with the unsupported-method contract error.
pub fn register(registry: &mut MethodRegistry, api: DebugRelay) {
    if !api.config().debug_api_enabled {
        registry.register_unsupported(&[
            "debug_traceTransaction",
            "debug_traceBlockByNumber",
            "debug_getRawBlock",
        ]);
        return
    }

    registry.register(entry(
        "debug_traceTransaction",
        ParamSpec::with_optional(1, vec![ParamKind::Hash, ParamKind::Object]),
        api.clone(),
        |api, params, ctx| async move {
            let hash: String = params::require(&params, 0)?;
            let options: TracerOptions = params::optional(&params, 1)?.unwrap_or_default();
            api.trace_transaction(&hash, &options, &ctx).await
        },
    ));
    registry.register(entry(
        "debug_traceBlockByNumber",
        ParamSpec::with_optional(1, vec![ParamKind::BlockRef, ParamKind::Object]),
        api.clone(),
        |api, params, ctx| async move {
            let block = BlockRef::parse(&params[0])?;
            let options: TracerOptions = params::optional(&params, 1)?.unwrap_or_default();
            api.trace_block_by_number(block, &options, &ctx).await
        },
    ));
    registry.register(entry(
        "debug_getRawBlock",
        ParamSpec::required(vec![ParamKind::BlockRefOrHash]),
        api,
        |api, params, ctx| async move {
            let block = BlockRef::parse(&params[0])?;
            Ok(json!(api.get_raw_block(block, &ctx).await?))
        },
    ));
}
