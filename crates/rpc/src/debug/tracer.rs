//! The three tracer implementations and the synthetic-transaction fallback.
//!
//! The mirror node has no single "trace" endpoint; each tracer stitches its
//! result together from several reads. Transactions that moved tokens without
//! running EVM bytecode have no actions or contract result at all — for those
//! the fallback derives a minimal trace from the transfer log, so a synthetic
//! transfer traces like an ordinary value transfer instead of erroring.

use super::{
    types::{CallFrame, OpcodeEntry, OpcodeTrace, PrestateAccount, TracerObjectConfig},
    DebugRelay,
};
use crate::{RpcError, RpcResult};
use relay_mirror::{ContractAction, ContractResult, LogEntry};
use relay_primitives::{
    hex_to_ascii, tinybar_to_weibar, to_quantity, MirrorTimestamp, RequestContext, U256,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// Cache ttl of prestate traces; entries describe finalized state.
const PRESTATE_TTL: std::time::Duration = std::time::Duration::from_secs(3600);

const CALLER: &str = "debug";

// === impl DebugRelay ===

impl DebugRelay {
    /// `callTracer`: the call tree of a transaction.
    pub(super) async fn call_tracer(
        &self,
        tx_id: &str,
        config: TracerObjectConfig,
        ctx: &RequestContext,
    ) -> RpcResult<Value> {
        let (actions, result) = futures::try_join!(
            self.mirror().contract_result_actions(tx_id),
            self.mirror().contract_result(tx_id),
        )?;

        let (Some(actions), Some(result)) =
            (actions.filter(|actions| !actions.is_empty()), result)
        else {
            debug!(target: "debug", %ctx, tx_id, "no execution data, trying synthetic fallback");
            let frame = self.synthetic_call_frame(tx_id, ctx).await?;
            return to_value(&frame)
        };

        let mut root = frame_from_result(&result, &actions[0]);
        if !config.only_top_call {
            root.calls = nest_actions(&actions[1..]);
        }
        to_value(&root)
    }

    /// `prestateTracer`: balance, nonce, code and storage of every account
    /// the transaction touched, as of just before execution.
    pub(super) async fn prestate_tracer(
        &self,
        tx_id: &str,
        config: TracerObjectConfig,
        ctx: &RequestContext,
    ) -> RpcResult<Value> {
        let cache_key = format!("prestateTracer:{tx_id}:{}", config.only_top_call);
        if let Some(hit) = self.cache().get(&cache_key, CALLER) {
            if let Ok(value) = serde_json::from_str(&hit) {
                trace!(target: "debug", %ctx, tx_id, "prestate served from cache");
                return Ok(value)
            }
        }

        let Some(actions) = self
            .mirror()
            .contract_result_actions(tx_id)
            .await?
            .filter(|actions| !actions.is_empty())
        else {
            // a synthetic transfer has no EVM prestate
            self.require_synthetic_logs(tx_id).await?;
            return Ok(Value::Object(Default::default()))
        };

        let mut participants: BTreeMap<String, (bool, MirrorTimestamp)> = BTreeMap::new();
        for action in actions.iter().filter(|a| !config.only_top_call || a.call_depth == 0) {
            participants
                .entry(action.from.to_lowercase())
                .or_insert((is_contract(action.caller_type.as_deref()), action.timestamp));
            if let Some(to) = &action.to {
                participants
                    .entry(to.to_lowercase())
                    .or_insert((is_contract(action.recipient_type.as_deref()), action.timestamp));
            }
        }

        let mut prestate: BTreeMap<String, PrestateAccount> = BTreeMap::new();
        for (address, (contract, timestamp)) in participants {
            match self.prestate_account(&address, contract, timestamp).await {
                Ok(account) => {
                    prestate.insert(address, account);
                }
                Err(err) => {
                    // partial data beats a failed trace
                    warn!(target: "debug", %ctx, %address, %err, "omitting entity from prestate");
                }
            }
        }

        let value = to_value(&prestate)?;
        self.cache().set(&cache_key, value.to_string(), CALLER, Some(PRESTATE_TTL));
        Ok(value)
    }

    async fn prestate_account(
        &self,
        address: &str,
        contract: bool,
        timestamp: MirrorTimestamp,
    ) -> RpcResult<PrestateAccount> {
        let balance = self
            .mirror()
            .balance_at(address, Some(timestamp))
            .await?
            .unwrap_or(0)
            .max(0) as u64;

        if contract {
            let code = self
                .mirror()
                .contract(address)
                .await?
                .and_then(|c| c.runtime_bytecode)
                .unwrap_or_else(|| "0x".to_owned());
            let storage = self
                .mirror()
                .contract_state_at(address, timestamp)
                .await?
                .into_iter()
                .map(|entry| (entry.slot, entry.value))
                .collect();
            Ok(PrestateAccount {
                balance: to_quantity(tinybar_to_weibar(balance)),
                nonce: 1,
                code,
                storage,
            })
        } else {
            let nonce = self
                .mirror()
                .account(address)
                .await?
                .map(|account| account.ethereum_nonce)
                .unwrap_or(0);
            Ok(PrestateAccount {
                balance: to_quantity(tinybar_to_weibar(balance)),
                nonce,
                code: "0x".to_owned(),
                storage: BTreeMap::new(),
            })
        }
    }

    /// `opcodeLogger`: the opcode-level struct log.
    pub(super) async fn opcode_logger(
        &self,
        tx_id: &str,
        memory: bool,
        stack: bool,
        storage: bool,
        ctx: &RequestContext,
    ) -> RpcResult<Value> {
        let Some(response) =
            self.mirror().contract_result_opcodes(tx_id, memory, stack, storage).await?
        else {
            debug!(target: "debug", %ctx, tx_id, "no opcodes, trying synthetic fallback");
            self.require_synthetic_logs(tx_id).await?;
            return to_value(&OpcodeTrace {
                gas: 0,
                failed: false,
                return_value: String::new(),
                struct_logs: vec![],
            })
        };

        let struct_logs = response
            .opcodes
            .into_iter()
            .map(|opcode| OpcodeEntry {
                pc: opcode.pc,
                op: opcode.op,
                gas: opcode.gas,
                gas_cost: opcode.gas_cost,
                depth: opcode.depth,
                stack: opcode.stack,
                memory: opcode.memory,
                storage: opcode.storage,
                reason: opcode.reason,
            })
            .collect();

        to_value(&OpcodeTrace {
            gas: response.gas,
            failed: response.failed,
            return_value: response
                .return_value
                .map(|v| v.trim_start_matches("0x").to_owned())
                .unwrap_or_default(),
            struct_logs,
        })
    }

    /// Builds the minimal call frame of a synthetic transfer.
    async fn synthetic_call_frame(
        &self,
        tx_id: &str,
        ctx: &RequestContext,
    ) -> RpcResult<CallFrame> {
        let log = self.require_synthetic_logs(tx_id).await?;

        let (from, to) = if log.topics.len() >= 3 {
            (address_from_topic(&log.topics[1]), address_from_topic(&log.topics[2]))
        } else {
            (log.address.clone(), log.address.clone())
        };

        let from = self.resolve_evm_address(&from).await;
        let to = self.resolve_evm_address(&to).await;
        debug!(target: "debug", %ctx, tx_id, %from, %to, "built synthetic transfer trace");

        Ok(CallFrame {
            typ: "CALL".to_owned(),
            from,
            to: Some(to),
            value: "0x0".to_owned(),
            gas: to_quantity(U256::from(self.config().tx_default_gas)),
            gas_used: "0x0".to_owned(),
            input: "0x".to_owned(),
            output: "0x".to_owned(),
            error: None,
            revert_reason: None,
            calls: vec![],
        })
    }

    /// Fetches the logs a synthetic transaction must have; no logs means the
    /// transaction does not exist in any shape the relay can trace.
    async fn require_synthetic_logs(&self, tx_id: &str) -> RpcResult<LogEntry> {
        self.mirror()
            .logs_by_transaction_hash(tx_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RpcError::ResourceNotFound(format!(
                    "Failed to retrieve transaction information for {tx_id}"
                ))
            })
    }

    /// Substitutes an entity's aliased EVM address when it has one.
    pub(super) async fn resolve_evm_address(&self, address: &str) -> String {
        if let Ok(Some(contract)) = self.mirror().contract(address).await {
            if let Some(evm) = contract.evm_address {
                return evm
            }
        }
        if let Ok(Some(account)) = self.mirror().account(address).await {
            if let Some(evm) = account.evm_address {
                return evm
            }
        }
        address.to_owned()
    }
}

/// The empty trace emitted for transactions that failed before execution.
pub(super) fn failed_result_frame(result: &ContractResult) -> CallFrame {
    CallFrame {
        typ: "CALL".to_owned(),
        from: result.from.clone(),
        to: result.to.clone(),
        value: "0x0".to_owned(),
        gas: "0x0".to_owned(),
        gas_used: "0x0".to_owned(),
        input: "0x".to_owned(),
        output: "0x".to_owned(),
        error: Some(result.result.clone()),
        revert_reason: Some(decode_result_message(result)),
        calls: vec![],
    }
}

fn frame_from_result(result: &ContractResult, root_action: &ContractAction) -> CallFrame {
    let mut frame = CallFrame {
        typ: action_type(root_action),
        from: result.from.clone(),
        to: result.to.clone(),
        value: to_quantity(tinybar_to_weibar(result.amount.unwrap_or(0).max(0) as u64)),
        gas: to_quantity(U256::from(result.gas_limit)),
        gas_used: to_quantity(U256::from(result.gas_used.unwrap_or(0))),
        input: result.function_parameters.clone().unwrap_or_else(|| "0x".to_owned()),
        output: result.call_result.clone().unwrap_or_else(|| "0x".to_owned()),
        error: None,
        revert_reason: None,
        calls: vec![],
    };
    if !result.is_success() {
        frame.error = Some(result.result.clone());
        frame.revert_reason = Some(decode_result_message(result));
    }
    frame
}

fn frame_from_action(action: &ContractAction) -> CallFrame {
    let failed = !matches!(action.result_data_type.as_deref(), Some("OUTPUT") | None);
    let data = action.result_data.clone().unwrap_or_else(|| "0x".to_owned());
    CallFrame {
        typ: action_type(action),
        from: action.from.clone(),
        to: action.to.clone(),
        value: to_quantity(tinybar_to_weibar(action.value.max(0) as u64)),
        gas: to_quantity(U256::from(action.gas)),
        gas_used: to_quantity(U256::from(action.gas_used)),
        input: action.input.clone().unwrap_or_else(|| "0x".to_owned()),
        output: if failed { "0x".to_owned() } else { data.clone() },
        error: failed.then(|| {
            action.result_data_type.clone().unwrap_or_else(|| "ERROR".to_owned())
        }),
        revert_reason: failed.then(|| decode_hex_message(&data)),
        calls: vec![],
    }
}

/// Builds the nested call tree of the non-root actions, which arrive in
/// execution order annotated with their call depth.
fn nest_actions(actions: &[ContractAction]) -> Vec<CallFrame> {
    let frames: Vec<CallFrame> = actions.iter().map(frame_from_action).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); frames.len()];
    let mut roots: Vec<usize> = Vec::new();
    // (depth, index) of the currently open call chain
    let mut open: Vec<(u32, usize)> = Vec::new();

    for (index, action) in actions.iter().enumerate() {
        while open.last().is_some_and(|(depth, _)| *depth >= action.call_depth) {
            open.pop();
        }
        match open.last() {
            Some((_, parent)) => children[*parent].push(index),
            None => roots.push(index),
        }
        open.push((action.call_depth, index));
    }

    fn build(index: usize, frames: &[CallFrame], children: &[Vec<usize>]) -> CallFrame {
        let mut frame = frames[index].clone();
        frame.calls =
            children[index].iter().map(|child| build(*child, frames, children)).collect();
        frame
    }

    roots.into_iter().map(|index| build(index, &frames, &children)).collect()
}

fn action_type(action: &ContractAction) -> String {
    action
        .call_operation_type
        .clone()
        .or_else(|| action.call_type.clone())
        .unwrap_or_else(|| "CALL".to_owned())
}

fn is_contract(entity_type: Option<&str>) -> bool {
    matches!(entity_type, Some("CONTRACT") | Some("TOKEN"))
}

/// The last 20 bytes of a 32-byte topic, as an address.
fn address_from_topic(topic: &str) -> String {
    let digits = topic.trim_start_matches("0x");
    if digits.len() >= 40 {
        format!("0x{}", &digits[digits.len() - 40..])
    } else {
        format!("0x{digits:0>40}")
    }
}

/// Decodes the mirror node's error message, which may be hex-wrapped text.
fn decode_result_message(result: &ContractResult) -> String {
    result
        .error_message
        .as_deref()
        .map(decode_hex_message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| result.result.clone())
}

fn decode_hex_message(message: &str) -> String {
    if message.starts_with("0x") {
        if let Some(decoded) = relay_primitives::decode_revert_reason(
            &alloy_primitives::hex::decode(message.trim_start_matches("0x")).unwrap_or_default(),
        ) {
            return decoded
        }
        if let Some(ascii) = hex_to_ascii(message) {
            return ascii
        }
    }
    message.to_owned()
}

fn to_value<T: serde::Serialize>(value: &T) -> RpcResult<Value> {
    serde_json::to_value(value).map_err(|err| RpcError::Internal(err.to_string()))
}
