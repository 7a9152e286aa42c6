//! Wire shapes of the `debug_*` tracers.

use crate::{RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The tracer selected by a `debug_traceTransaction` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracerKind {
    /// Call-tree tracer.
    CallTracer,
    /// Pre-execution state tracer.
    PrestateTracer,
    /// Opcode-level struct logger; the default when no tracer is named.
    #[default]
    OpcodeLogger,
}

/// The object-valued `tracerConfig` of a trace call.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TracerObjectConfig {
    /// Restrict the trace to the top-level call.
    pub only_top_call: bool,
}

/// Options of `debug_traceTransaction` / `debug_traceBlockByNumber`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TracerOptions {
    /// Named tracer; absent selects the opcode logger.
    pub tracer: Option<String>,
    /// Tracer-specific configuration.
    pub tracer_config: TracerObjectConfig,
    /// Capture memory words per opcode.
    pub enable_memory: bool,
    /// Suppress the stack per opcode.
    pub disable_stack: bool,
    /// Suppress touched storage per opcode.
    pub disable_storage: bool,
}

// === impl TracerOptions ===

impl TracerOptions {
    /// Resolves the selected tracer.
    pub fn kind(&self) -> RpcResult<TracerKind> {
        match self.tracer.as_deref() {
            None => Ok(TracerKind::OpcodeLogger),
            Some("callTracer") => Ok(TracerKind::CallTracer),
            Some("prestateTracer") => Ok(TracerKind::PrestateTracer),
            Some("opcodeLogger") => Ok(TracerKind::OpcodeLogger),
            Some(other) => {
                Err(RpcError::InvalidArguments(format!("unknown tracer: {other}")))
            }
        }
    }
}

/// One frame of a `callTracer` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    /// The call operation (`CALL`, `CREATE`, `DELEGATECALL`, ...).
    #[serde(rename = "type")]
    pub typ: String,
    /// Caller address.
    pub from: String,
    /// Callee address, `null` for creations.
    pub to: Option<String>,
    /// Transferred value in weibar.
    pub value: String,
    /// Gas available to the frame.
    pub gas: String,
    /// Gas the frame consumed.
    pub gas_used: String,
    /// Call data.
    pub input: String,
    /// Return data.
    pub output: String,
    /// Execution result when not successful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Decoded revert reason, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    /// Child frames, empty when `onlyTopCall` is set.
    pub calls: Vec<CallFrame>,
}

/// One entry of an `opcodeLogger` result.
///
/// `stack`, `memory` and `storage` are `null` — not omitted — when the
/// corresponding capture flag disabled them; clients distinguish "not
/// captured" from "empty".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpcodeEntry {
    /// Program counter.
    pub pc: u64,
    /// Mnemonic.
    pub op: String,
    /// Remaining gas.
    pub gas: u64,
    /// Cost of this opcode.
    pub gas_cost: u64,
    /// Call depth.
    pub depth: u32,
    /// Stack words.
    pub stack: Option<Vec<String>>,
    /// Memory words.
    pub memory: Option<Vec<String>>,
    /// Touched storage slots.
    pub storage: Option<BTreeMap<String, String>>,
    /// Halt reason, when the opcode halted execution.
    pub reason: Option<String>,
}

/// An `opcodeLogger` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpcodeTrace {
    /// Total gas consumed.
    pub gas: u64,
    /// Whether execution failed.
    pub failed: bool,
    /// Return data, unprefixed hex.
    pub return_value: String,
    /// The executed opcodes.
    pub struct_logs: Vec<OpcodeEntry>,
}

/// One account of a `prestateTracer` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrestateAccount {
    /// Balance in weibar.
    pub balance: String,
    /// Account nonce.
    pub nonce: u64,
    /// Runtime bytecode, `0x` for non-contracts.
    pub code: String,
    /// Storage slots.
    pub storage: BTreeMap<String, String>,
}

/// One element of a `debug_traceBlockByNumber` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTraceEntry {
    /// The traced transaction.
    pub tx_hash: String,
    /// The tracer output.
    pub result: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_parse_the_geth_shape() {
        let options: TracerOptions = serde_json::from_value(json!({
            "tracer": "callTracer",
            "tracerConfig": { "onlyTopCall": true }
        }))
        .unwrap();
        assert_eq!(options.kind().unwrap(), TracerKind::CallTracer);
        assert!(options.tracer_config.only_top_call);

        let default: TracerOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(default.kind().unwrap(), TracerKind::OpcodeLogger);

        let unknown: TracerOptions =
            serde_json::from_value(json!({ "tracer": "flamegraph" })).unwrap();
        assert!(unknown.kind().is_err());
    }

    #[test]
    fn opcode_entries_serialize_explicit_nulls() {
        let entry = OpcodeEntry {
            pc: 0,
            op: "PUSH1".into(),
            gas: 100,
            gas_cost: 3,
            depth: 1,
            stack: None,
            memory: None,
            storage: None,
            reason: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json["stack"].is_null());
        assert!(json["memory"].is_null());
        assert!(json["storage"].is_null());
        assert!(json.get("gasCost").is_some());
    }
}
