//! The `net_*` namespace.
//!
//! The relay is not a p2p node; the namespace exists because wallets probe it.

use crate::registry::{MethodEntry, MethodRegistry, ParamSpec};
use serde_json::json;
use std::sync::Arc;

/// Registers the namespace.
pub fn register(registry: &mut MethodRegistry, chain_id: u64) {
    registry.register(MethodEntry {
        name: "net_version",
        params: ParamSpec::none(),
        cache_policy: None,
        handler: Arc::new(move |_, _| {
            Box::pin(async move { Ok(json!(chain_id.to_string())) })
        }),
    });
    registry.register(MethodEntry {
        name: "net_listening",
        params: ParamSpec::none(),
        cache_policy: None,
        handler: Arc::new(|_, _| Box::pin(async { Ok(json!(false)) })),
    });
    registry.register_unsupported(&["net_peerCount"]);
}
