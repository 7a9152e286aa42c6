//! Adapter from the method registry to a jsonrpsee [`RpcModule`].
//!
//! Transport concerns (listeners, websocket upgrades, middleware) stay with
//! the binary; this module only bridges jsonrpsee's callback signature onto
//! [`MethodRegistry::dispatch`].

use crate::MethodRegistry;
use jsonrpsee::RpcModule;
use relay_primitives::RequestContext;
use serde_json::Value;
use std::sync::Arc;

/// Builds a jsonrpsee module serving every registered method.
pub fn rpc_module(registry: Arc<MethodRegistry>) -> RpcModule<Arc<MethodRegistry>> {
    let mut module = RpcModule::new(registry.clone());
    let names: Vec<&'static str> = registry.method_names().collect();

    for name in names {
        module
            .register_async_method(name, move |params, registry, _extensions| async move {
                let params: Vec<Value> = params.parse().unwrap_or_default();
                let ctx = RequestContext::new(next_request_id(), None);
                registry
                    .dispatch(name, params, ctx)
                    .await
                    .map_err(crate::RpcError::into_error_object)
            })
            .expect("method names are unique and valid");
    }
    module
}

/// Correlation id attached to every inbound request.
fn next_request_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}
