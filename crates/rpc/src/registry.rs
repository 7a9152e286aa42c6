//! The central method registry.
//!
//! Every rpc method is registered as a [`MethodEntry`] bundling its name,
//! parameter validation rules, an optional memoization policy and the handler
//! itself. The dispatcher is the single choke point: it validates, consults
//! the cache, runs the handler and stores the result — the namespace
//! implementations never deal with caching or arity themselves.

use crate::{RpcError, RpcResult};
use futures::future::BoxFuture;
use metrics::{counter, histogram};
use relay_cache::{CachePolicy, SharedCache};
use relay_primitives::RequestContext;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, trace};

const CALLER: &str = "rpc";

/// Type-level validation applied to one positional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A `0x`-prefixed 20-byte address.
    Address,
    /// A `0x`-prefixed 32-byte hash.
    Hash,
    /// A `0x`-prefixed quantity.
    Quantity,
    /// A block number quantity or one of the block tags.
    BlockRef,
    /// A block number quantity, block tag, or 32-byte block hash.
    BlockRefOrHash,
    /// Arbitrary `0x`-prefixed data.
    HexData,
    /// A JSON boolean.
    Boolean,
    /// A JSON object.
    Object,
    /// Anything; validated by the handler.
    Any,
}

impl ParamKind {
    fn validate(&self, value: &Value, index: usize) -> RpcResult<()> {
        let fail = |expected: &str| {
            Err(RpcError::InvalidArguments(format!(
                "expected {expected} at parameter {index}, got {value}"
            )))
        };
        match self {
            Self::Address => match value.as_str() {
                Some(s) if is_prefixed_hex(s, Some(40)) => Ok(()),
                _ => fail("a 20-byte hex address"),
            },
            Self::Hash => match value.as_str() {
                Some(s) if is_prefixed_hex(s, Some(64)) => Ok(()),
                _ => fail("a 32-byte hex hash"),
            },
            Self::Quantity => match value.as_str() {
                Some(s) if is_prefixed_hex(s, None) => Ok(()),
                _ => fail("a hex quantity"),
            },
            Self::BlockRef => match value.as_str() {
                Some(s) if is_block_tag(s) || is_prefixed_hex(s, None) => Ok(()),
                _ => fail("a block number or tag"),
            },
            Self::BlockRefOrHash => match value.as_str() {
                Some(s)
                    if is_block_tag(s) ||
                        is_prefixed_hex(s, Some(64)) ||
                        is_prefixed_hex(s, None) =>
                {
                    Ok(())
                }
                _ => fail("a block number, tag or hash"),
            },
            Self::HexData => match value.as_str() {
                Some(s) if is_prefixed_hex_data(s) => Ok(()),
                _ => fail("hex data"),
            },
            Self::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    fail("a boolean")
                }
            }
            Self::Object => {
                if value.is_object() {
                    Ok(())
                } else {
                    fail("an object")
                }
            }
            Self::Any => Ok(()),
        }
    }
}

/// Arity and per-position validation of a method's parameter list.
#[derive(Debug, Clone, Default)]
pub struct ParamSpec {
    /// Number of leading parameters that must be present.
    pub required: usize,
    /// Validation per position; optional positions beyond `required` are
    /// validated only when provided.
    pub kinds: Vec<ParamKind>,
}

// === impl ParamSpec ===

impl ParamSpec {
    /// A spec with no parameters.
    pub const fn none() -> Self {
        Self { required: 0, kinds: Vec::new() }
    }

    /// A spec with `kinds.len()` required parameters.
    pub fn required(kinds: Vec<ParamKind>) -> Self {
        Self { required: kinds.len(), kinds }
    }

    /// A spec where only the first `required` parameters are mandatory.
    pub fn with_optional(required: usize, kinds: Vec<ParamKind>) -> Self {
        Self { required, kinds }
    }

    fn validate(&self, params: &[Value]) -> RpcResult<()> {
        if params.len() < self.required {
            return Err(RpcError::InvalidArguments(format!(
                "missing required parameter {}",
                params.len()
            )))
        }
        if params.len() > self.kinds.len() {
            return Err(RpcError::InvalidArguments(format!(
                "expected at most {} parameters, got {}",
                self.kinds.len(),
                params.len()
            )))
        }
        for (index, (value, kind)) in params.iter().zip(self.kinds.iter()).enumerate() {
            // a null in an optional position counts as absent
            if index >= self.required && value.is_null() {
                continue
            }
            kind.validate(value, index)?;
        }
        Ok(())
    }
}

/// An async handler taking the validated parameter list.
pub type MethodHandler =
    Arc<dyn Fn(Vec<Value>, RequestContext) -> BoxFuture<'static, RpcResult<Value>> + Send + Sync>;

/// One registered rpc method.
pub struct MethodEntry {
    /// The wire name, e.g. `eth_getBalance`.
    pub name: &'static str,
    /// Parameter validation rules.
    pub params: ParamSpec,
    /// Memoization policy; `None` disables caching.
    pub cache_policy: Option<CachePolicy>,
    /// The handler.
    pub handler: MethodHandler,
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("cache_policy", &self.cache_policy)
            .finish_non_exhaustive()
    }
}

/// The registry the dispatcher routes through.
#[derive(Debug)]
pub struct MethodRegistry {
    methods: HashMap<&'static str, MethodEntry>,
    cache: SharedCache,
}

// === impl MethodRegistry ===

impl MethodRegistry {
    /// Creates an empty registry backed by `cache`.
    pub fn new(cache: SharedCache) -> Self {
        Self { methods: HashMap::new(), cache }
    }

    /// Registers `entry`, replacing any previous registration of the name.
    pub fn register(&mut self, entry: MethodEntry) {
        trace!(target: "rpc", method = entry.name, "registered");
        self.methods.insert(entry.name, entry);
    }

    /// Registers every name in `names` as an unsupported method.
    pub fn register_unsupported(&mut self, names: &[&'static str]) {
        for name in names {
            self.register(MethodEntry {
                name,
                params: ParamSpec { required: 0, kinds: vec![ParamKind::Any; 8] },
                cache_policy: None,
                handler: Arc::new(|_, _| Box::pin(async { Err(RpcError::UnsupportedMethod) })),
            });
        }
    }

    /// Names of all registered methods.
    pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }

    /// Validates and runs `method`, consulting the memoization policy.
    pub async fn dispatch(
        &self,
        method: &str,
        params: Vec<Value>,
        ctx: RequestContext,
    ) -> RpcResult<Value> {
        let Some(entry) = self.methods.get(method) else {
            counter!("relay_rpc_unsupported_total").increment(1);
            return Err(RpcError::UnsupportedMethod)
        };
        entry.params.validate(&params)?;

        let started = std::time::Instant::now();
        let result = self.run(entry, params, ctx).await;

        histogram!("relay_rpc_duration_seconds", "method" => entry.name)
            .record(started.elapsed().as_secs_f64());
        if result.is_err() {
            counter!("relay_rpc_errors_total", "method" => entry.name).increment(1);
        }
        result
    }

    async fn run(
        &self,
        entry: &MethodEntry,
        params: Vec<Value>,
        ctx: RequestContext,
    ) -> RpcResult<Value> {
        let cache_key = entry
            .cache_policy
            .as_ref()
            .filter(|policy| !policy.should_skip(&params))
            .map(|policy| (policy.cache_key(entry.name, &params), policy.ttl));

        if let Some((key, _)) = &cache_key {
            if let Some(hit) = self.cache.get(key, CALLER) {
                if let Ok(value) = serde_json::from_str(&hit) {
                    debug!(target: "rpc", %ctx, method = entry.name, "served from cache");
                    counter!("relay_rpc_cache_hits_total", "method" => entry.name).increment(1);
                    return Ok(value)
                }
            }
        }

        let result = (entry.handler)(params, ctx).await?;

        if let Some((key, ttl)) = cache_key {
            self.cache.set(&key, result.to_string(), CALLER, ttl);
        }
        Ok(result)
    }
}

fn is_prefixed_hex(s: &str, exact_digits: Option<usize>) -> bool {
    let Some(digits) = s.strip_prefix("0x") else { return false };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false
    }
    exact_digits.map_or(true, |n| digits.len() == n)
}

/// Like [`is_prefixed_hex`] but allows the empty payload `0x`.
fn is_prefixed_hex_data(s: &str) -> bool {
    let Some(digits) = s.strip_prefix("0x") else { return false };
    digits.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_block_tag(s: &str) -> bool {
    matches!(s, "latest" | "earliest" | "pending" | "safe" | "finalized")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use relay_cache::LocalCache;
    use serde_json::json;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    fn ctx() -> RequestContext {
        RequestContext::new("req-test".into(), None)
    }

    fn registry() -> MethodRegistry {
        MethodRegistry::new(Arc::new(LocalCache::default()))
    }

    fn counting_entry(
        name: &'static str,
        params: ParamSpec,
        cache_policy: Option<CachePolicy>,
        calls: Arc<AtomicUsize>,
    ) -> MethodEntry {
        MethodEntry {
            name,
            params,
            cache_policy,
            handler: Arc::new(move |args, _| {
                let calls = calls.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({ "echo": args }))
                })
            }),
        }
    }

    #[tokio::test]
    async fn unknown_method_is_unsupported() {
        let registry = registry();
        assert_matches!(
            registry.dispatch("eth_unknown", vec![], ctx()).await,
            Err(RpcError::UnsupportedMethod)
        );
    }

    #[tokio::test]
    async fn arity_and_kinds_are_validated() {
        let mut registry = registry();
        registry.register(counting_entry(
            "eth_getBalance",
            ParamSpec::required(vec![ParamKind::Address, ParamKind::BlockRef]),
            None,
            Arc::new(AtomicUsize::new(0)),
        ));

        // missing parameter
        assert_matches!(
            registry
                .dispatch("eth_getBalance", vec![json!("0x0000000000000000000000000000000000000001")], ctx())
                .await,
            Err(RpcError::InvalidArguments(_))
        );
        // bad address
        assert_matches!(
            registry.dispatch("eth_getBalance", vec![json!("0x123"), json!("latest")], ctx()).await,
            Err(RpcError::InvalidArguments(_))
        );
        // too many parameters
        assert_matches!(
            registry
                .dispatch(
                    "eth_getBalance",
                    vec![
                        json!("0x0000000000000000000000000000000000000001"),
                        json!("latest"),
                        json!(true)
                    ],
                    ctx()
                )
                .await,
            Err(RpcError::InvalidArguments(_))
        );
        // well-formed
        registry
            .dispatch(
                "eth_getBalance",
                vec![json!("0x0000000000000000000000000000000000000001"), json!("0x10")],
                ctx(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cache_policy_memoizes_but_skips_tags() {
        let mut registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register(counting_entry(
            "eth_getBlockByNumber",
            ParamSpec::required(vec![ParamKind::BlockRef, ParamKind::Boolean]),
            Some(CachePolicy::with_ttl(Duration::from_secs(60)).skip_block_tags(0)),
            calls.clone(),
        ));

        let params = vec![json!("0x10"), json!(false)];
        registry.dispatch("eth_getBlockByNumber", params.clone(), ctx()).await.unwrap();
        registry.dispatch("eth_getBlockByNumber", params, ctx()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let tagged = vec![json!("latest"), json!(false)];
        registry.dispatch("eth_getBlockByNumber", tagged.clone(), ctx()).await.unwrap();
        registry.dispatch("eth_getBlockByNumber", tagged, ctx()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unsupported_set_returns_the_contract_error() {
        let mut registry = registry();
        registry.register_unsupported(&["eth_coinbase"]);
        let err = registry.dispatch("eth_coinbase", vec![], ctx()).await.unwrap_err();
        assert_eq!(err.code(), -32601);
        assert_eq!(err.to_string(), "Unsupported JSON-RPC method");
    }
}
