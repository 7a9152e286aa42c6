//! The `txpool_*` namespace, serving views over the pending pool.

use crate::{
    params,
    registry::{MethodEntry, MethodRegistry, ParamKind, ParamSpec},
    RpcError, RpcResult,
};
use relay_pool::PendingPool;
use relay_primitives::{to_quantity, Address, SignedTransaction, U256};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Shapes one pooled transaction the way `txpool_content` reports it.
fn shape_pooled(tx: &SignedTransaction, sender: Address) -> Value {
    json!({
        "hash": format!("{:?}", tx.hash()),
        "from": format!("{sender:?}"),
        "to": tx.to().map(|to| format!("{to:?}")),
        "nonce": to_quantity(U256::from(tx.nonce())),
        "gas": to_quantity(U256::from(tx.gas_limit())),
        "gasPrice": to_quantity(U256::from(tx.max_gas_price())),
        "value": to_quantity(tx.value()),
        "input": format!("{}", tx.input()),
        "type": to_quantity(U256::from(tx.tx_type().as_u8())),
        "blockHash": Value::Null,
        "blockNumber": Value::Null,
        "transactionIndex": Value::Null,
    })
}

fn content_value(pool: &PendingPool) -> Value {
    let mut pending = Map::new();
    for (sender, by_nonce) in pool.content() {
        let mut entries = Map::new();
        for (nonce, tx) in by_nonce {
            entries.insert(nonce.to_string(), shape_pooled(&tx, sender));
        }
        pending.insert(format!("{sender:?}"), Value::Object(entries));
    }
    json!({ "pending": pending, "queued": {} })
}

fn register_entry<F>(registry: &mut MethodRegistry, name: &'static str, spec: ParamSpec, f: F)
where
    F: Fn(Vec<Value>) -> RpcResult<Value> + Send + Sync + 'static,
{
    registry.register(MethodEntry {
        name,
        params: spec,
        cache_policy: None,
        handler: {
            let f = Arc::new(f);
            Arc::new(move |params, _| {
                let f = f.clone();
                Box::pin(async move { f(params) })
            })
        },
    });
}

/// Registers the namespace; a deployment without the txpool api answers with
/// the unsupported-method contract error.
pub fn register(registry: &mut MethodRegistry, pool: Option<Arc<PendingPool>>) {
    let Some(pool) = pool else {
        registry.register_unsupported(&[
            "txpool_content",
            "txpool_contentFrom",
            "txpool_inspect",
            "txpool_status",
        ]);
        return
    };

    register_entry(registry, "txpool_content", ParamSpec::none(), {
        let pool = pool.clone();
        move |_| Ok(content_value(&pool))
    });
    register_entry(
        registry,
        "txpool_contentFrom",
        ParamSpec::required(vec![ParamKind::Address]),
        {
            let pool = pool.clone();
            move |params| {
                let address: String = params::require(&params, 0)?;
                let sender: Address = address
                    .parse()
                    .map_err(|_| RpcError::InvalidArguments(format!("invalid address {address}")))?;
                let mut entries = Map::new();
                for (nonce, tx) in pool.content_from(sender) {
                    entries.insert(nonce.to_string(), shape_pooled(&tx, sender));
                }
                Ok(json!({ "pending": { format!("{sender:?}"): entries }, "queued": {} }))
            }
        },
    );
    register_entry(registry, "txpool_inspect", ParamSpec::none(), {
        let pool = pool.clone();
        move |_| {
            let mut pending = Map::new();
            for (sender, by_nonce) in pool.inspect() {
                let mut entries = Map::new();
                for (nonce, summary) in by_nonce {
                    entries.insert(nonce.to_string(), json!(summary));
                }
                pending.insert(format!("{sender:?}"), Value::Object(entries));
            }
            Ok(json!({ "pending": pending, "queued": {} }))
        }
    });
    register_entry(registry, "txpool_status", ParamSpec::none(), move |_| {
        Ok(json!({
            "pending": to_quantity(U256::from(pool.len())),
            "queued": "0x0",
        }))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use relay_cache::LocalCache;
    use relay_pool::SessionToken;
    use relay_primitives::{
        transaction::{AccessList, Signature, Transaction, TransactionKind},
        Bytes, RequestContext,
    };

    fn pooled(nonce: u64) -> SignedTransaction {
        SignedTransaction::new(
            Transaction::Eip1559 {
                chain_id: 298,
                nonce,
                max_priority_fee_per_gas: 0,
                max_fee_per_gas: 1_000_000,
                gas_limit: 21_000,
                to: TransactionKind::Call(address!("00000000000000000000000000000000000000cc")),
                value: relay_primitives::U256::from(5u64),
                input: Bytes::new(),
                access_list: AccessList::default(),
            },
            Signature::default(),
        )
    }

    #[tokio::test]
    async fn views_reflect_the_pool() {
        let sender = address!("00000000000000000000000000000000000000aa");
        let pool = Arc::new(PendingPool::new(true));
        pool.admit(sender, pooled(3), SessionToken::random()).unwrap();

        let mut registry = MethodRegistry::new(Arc::new(LocalCache::default()));
        register(&mut registry, Some(pool));

        let ctx = RequestContext::new("req".into(), None);
        let status = registry.dispatch("txpool_status", vec![], ctx.clone()).await.unwrap();
        assert_eq!(status["pending"], "0x1");

        let content = registry.dispatch("txpool_content", vec![], ctx.clone()).await.unwrap();
        let entry = &content["pending"][format!("{sender:?}")]["3"];
        assert_eq!(entry["nonce"], "0x3");
        assert!(entry["blockHash"].is_null());

        let inspect = registry.dispatch("txpool_inspect", vec![], ctx).await.unwrap();
        assert!(inspect["pending"][format!("{sender:?}")]["3"]
            .as_str()
            .unwrap()
            .contains("21000 gas"));
    }

    #[tokio::test]
    async fn disabled_namespace_is_unsupported() {
        let mut registry = MethodRegistry::new(Arc::new(LocalCache::default()));
        register(&mut registry, None);

        let ctx = RequestContext::new("req".into(), None);
        let err = registry.dispatch("txpool_status", vec![], ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported JSON-RPC method");
    }
}
