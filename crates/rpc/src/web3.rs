//! The `web3_*` namespace.

use crate::{
    params,
    registry::{MethodEntry, MethodRegistry, ParamKind, ParamSpec},
};
use relay_primitives::keccak256;
use serde_json::json;
use std::sync::Arc;

/// The reported client version.
const CLIENT_VERSION: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

/// Registers the namespace.
pub fn register(registry: &mut MethodRegistry) {
    registry.register(MethodEntry {
        name: "web3_clientVersion",
        params: ParamSpec::none(),
        cache_policy: None,
        handler: Arc::new(|_, _| Box::pin(async { Ok(json!(CLIENT_VERSION)) })),
    });
    registry.register(MethodEntry {
        name: "web3_sha3",
        params: ParamSpec::required(vec![ParamKind::HexData]),
        cache_policy: None,
        handler: Arc::new(|params, _| {
            Box::pin(async move {
                let raw: String = params::require(&params, 0)?;
                let bytes = params::hex_bytes(&raw)?;
                Ok(json!(format!("{:?}", keccak256(bytes))))
            })
        }),
    });
}
