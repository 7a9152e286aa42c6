//! Serde model of the mirror-node REST responses.
//!
//! Field sets follow the upstream OpenAPI document; fields the relay never
//! reads are omitted and unknown fields are ignored. Quantities the mirror
//! node serves as decimal strings stay strings here — callers convert at the
//! point of use.

use relay_primitives::MirrorTimestamp;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Pagination links attached to list responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    /// Path of the next page, when the result was truncated.
    pub next: Option<String>,
}

/// A closed timestamp interval.
#[derive(Debug, Clone, Deserialize)]
pub struct TimestampRange {
    /// Start of the interval.
    pub from: MirrorTimestamp,
    /// End of the interval, open for the latest block.
    pub to: Option<MirrorTimestamp>,
}

/// `blocks/{ref}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockResponse {
    /// Number of transactions in the block.
    #[serde(default)]
    pub count: u64,
    /// Keccak hash, `0x`-prefixed, 48 bytes on Hedera (SHA-384).
    pub hash: String,
    /// Block number.
    pub number: u64,
    /// Hash of the previous block.
    pub previous_hash: String,
    /// Consensus timestamp interval the block covers.
    pub timestamp: TimestampRange,
    /// Total gas used by the block's transactions.
    #[serde(default)]
    pub gas_used: u64,
    /// Bloom filter of the block's logs.
    #[serde(default)]
    pub logs_bloom: Option<String>,
    /// Size of the block in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// `blocks?limit=1&order=desc` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BlocksResponse {
    /// The requested page of blocks.
    pub blocks: Vec<BlockResponse>,
    /// Pagination.
    #[serde(default)]
    pub links: Links,
}

/// `contracts/results/{id}` response; also the element of the
/// `contracts/results` range listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractResult {
    /// EVM address of the executed contract.
    #[serde(default)]
    pub address: Option<String>,
    /// Transferred value in tinybar.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Hash of the containing block.
    #[serde(default)]
    pub block_hash: Option<String>,
    /// Number of the containing block.
    #[serde(default)]
    pub block_number: Option<u64>,
    /// Return data of the call, `0x`-prefixed.
    #[serde(default)]
    pub call_result: Option<String>,
    /// Id of the executed contract.
    #[serde(default)]
    pub contract_id: Option<String>,
    /// Revert payload or error description, `0x`-prefixed when binary.
    #[serde(default)]
    pub error_message: Option<String>,
    /// EVM address of the caller.
    pub from: String,
    /// Call data, `0x`-prefixed.
    #[serde(default)]
    pub function_parameters: Option<String>,
    /// Gas limit of the transaction.
    #[serde(default)]
    pub gas_limit: u64,
    /// Gas consumed.
    #[serde(default)]
    pub gas_used: Option<u64>,
    /// Effective gas price, `0x`-prefixed weibar.
    #[serde(default)]
    pub gas_price: Option<String>,
    /// Ethereum transaction hash.
    pub hash: String,
    /// Sender nonce.
    #[serde(default)]
    pub nonce: Option<u64>,
    /// Execution result name (`SUCCESS`, `WRONG_NONCE`, ...).
    pub result: String,
    /// Consensus timestamp of execution.
    pub timestamp: MirrorTimestamp,
    /// EVM address of the callee.
    #[serde(default)]
    pub to: Option<String>,
    /// Position within the block.
    #[serde(default)]
    pub transaction_index: Option<u64>,
    /// EIP-2718 transaction type.
    #[serde(default, rename = "type")]
    pub tx_type: Option<u8>,
    /// Chain id, `0x`-prefixed.
    #[serde(default)]
    pub chain_id: Option<String>,
    /// Fee cap of dynamic-fee transactions, `0x`-prefixed weibar.
    #[serde(default)]
    pub max_fee_per_gas: Option<String>,
    /// Priority fee of dynamic-fee transactions, `0x`-prefixed weibar.
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<String>,
    /// Signature recovery value.
    #[serde(default)]
    pub v: Option<i64>,
    /// Signature R, `0x`-prefixed.
    #[serde(default)]
    pub r: Option<String>,
    /// Signature S, `0x`-prefixed.
    #[serde(default)]
    pub s: Option<String>,
}

impl ContractResult {
    /// Whether execution succeeded.
    pub fn is_success(&self) -> bool {
        self.result == "SUCCESS"
    }
}

/// `contracts/results?timestamp=...` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractResultsResponse {
    /// The matching results in requested order.
    pub results: Vec<ContractResult>,
    /// Pagination.
    #[serde(default)]
    pub links: Links,
}

/// One frame of the execution action trace.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractAction {
    /// Depth in the call tree; the root action has depth 0.
    pub call_depth: u32,
    /// `CALL`, `CREATE`, `DELEGATECALL`, ... as executed.
    #[serde(default)]
    pub call_operation_type: Option<String>,
    /// Kind of the frame itself.
    #[serde(default)]
    pub call_type: Option<String>,
    /// Entity id of the caller.
    #[serde(default)]
    pub caller: Option<String>,
    /// `ACCOUNT` or `CONTRACT`.
    #[serde(default)]
    pub caller_type: Option<String>,
    /// EVM address of the caller.
    pub from: String,
    /// Gas available to the frame.
    pub gas: u64,
    /// Gas the frame consumed.
    pub gas_used: u64,
    /// Position of the action in execution order.
    pub index: u32,
    /// Call data of the frame, `0x`-prefixed.
    #[serde(default)]
    pub input: Option<String>,
    /// Entity id of the callee.
    #[serde(default)]
    pub recipient: Option<String>,
    /// `ACCOUNT`, `CONTRACT` or `TOKEN`.
    #[serde(default)]
    pub recipient_type: Option<String>,
    /// Output, revert reason or error payload, per `result_data_type`.
    #[serde(default)]
    pub result_data: Option<String>,
    /// Discriminates `result_data`: `OUTPUT`, `REVERT_REASON` or `ERROR`.
    #[serde(default)]
    pub result_data_type: Option<String>,
    /// Consensus timestamp of the transaction.
    pub timestamp: MirrorTimestamp,
    /// EVM address of the callee.
    #[serde(default)]
    pub to: Option<String>,
    /// Transferred value in tinybar.
    #[serde(default)]
    pub value: i64,
}

/// `contracts/results/{id}/actions` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractActionsResponse {
    /// Actions in execution order.
    pub actions: Vec<ContractAction>,
    /// Pagination.
    #[serde(default)]
    pub links: Links,
}

/// A single executed opcode of `contracts/results/{id}/opcodes`.
#[derive(Debug, Clone, Deserialize)]
pub struct Opcode {
    /// Call depth at execution.
    pub depth: u32,
    /// Remaining gas before execution.
    pub gas: u64,
    /// Gas cost of the opcode.
    pub gas_cost: u64,
    /// Memory words, present when requested.
    #[serde(default)]
    pub memory: Option<Vec<String>>,
    /// Mnemonic.
    pub op: String,
    /// Program counter.
    pub pc: u64,
    /// Halt reason, if the opcode halted execution.
    #[serde(default)]
    pub reason: Option<String>,
    /// Stack words, present when requested.
    #[serde(default)]
    pub stack: Option<Vec<String>>,
    /// Touched storage slots, present when requested.
    #[serde(default)]
    pub storage: Option<BTreeMap<String, String>>,
}

/// `contracts/results/{id}/opcodes` response.
#[derive(Debug, Clone, Deserialize)]
pub struct OpcodesResponse {
    /// Total gas consumed.
    pub gas: u64,
    /// Whether execution failed.
    pub failed: bool,
    /// Return data, `0x`-prefixed.
    #[serde(default)]
    pub return_value: Option<String>,
    /// The executed opcodes in order.
    pub opcodes: Vec<Opcode>,
}

/// A log entry of `contracts/results/logs`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    /// EVM address of the emitting contract.
    pub address: String,
    /// Id of the emitting contract.
    #[serde(default)]
    pub contract_id: Option<String>,
    /// ABI-encoded payload, `0x`-prefixed.
    #[serde(default)]
    pub data: Option<String>,
    /// Position within the transaction.
    #[serde(default)]
    pub index: u32,
    /// Indexed topics, `0x`-prefixed.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Hash of the containing block.
    #[serde(default)]
    pub block_hash: Option<String>,
    /// Number of the containing block.
    #[serde(default)]
    pub block_number: Option<u64>,
    /// Consensus timestamp.
    pub timestamp: MirrorTimestamp,
    /// Ethereum hash of the emitting transaction.
    pub transaction_hash: String,
    /// Position of the transaction within the block.
    #[serde(default)]
    pub transaction_index: Option<u64>,
}

/// `contracts/results/logs` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsResponse {
    /// Matching logs in requested order.
    pub logs: Vec<LogEntry>,
    /// Pagination.
    #[serde(default)]
    pub links: Links,
}

/// Balance snapshot inside an account response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalance {
    /// Balance in tinybar.
    pub balance: i64,
    /// Snapshot timestamp.
    #[serde(default)]
    pub timestamp: Option<MirrorTimestamp>,
}

/// `accounts/{addr}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    /// Entity id of the account.
    pub account: String,
    /// Aliased EVM address, when one exists.
    #[serde(default)]
    pub evm_address: Option<String>,
    /// The account's Ethereum-equivalent nonce.
    #[serde(default)]
    pub ethereum_nonce: u64,
    /// Current balance.
    pub balance: AccountBalance,
    /// Whether the account is deleted.
    #[serde(default)]
    pub deleted: bool,
}

/// `contracts/{addr}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractInfo {
    /// Entity id of the contract.
    pub contract_id: String,
    /// Aliased EVM address, when one exists.
    #[serde(default)]
    pub evm_address: Option<String>,
    /// Whether the contract is deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Creation timestamp.
    #[serde(default)]
    pub created_timestamp: Option<MirrorTimestamp>,
    /// Runtime bytecode, `0x`-prefixed.
    #[serde(default)]
    pub runtime_bytecode: Option<String>,
}

/// One element of `balances?account.id=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceEntry {
    /// Entity id of the account.
    pub account: String,
    /// Balance in tinybar at the snapshot.
    pub balance: i64,
}

/// `balances` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BalancesResponse {
    /// Snapshot timestamp the balances refer to.
    #[serde(default)]
    pub timestamp: Option<MirrorTimestamp>,
    /// The matching balances.
    pub balances: Vec<BalanceEntry>,
}

/// One storage slot of `contracts/{id}/state`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractStateEntry {
    /// EVM address of the contract.
    #[serde(default)]
    pub address: Option<String>,
    /// Storage slot, `0x`-prefixed.
    pub slot: String,
    /// Slot value, `0x`-prefixed.
    pub value: String,
    /// Timestamp the value was read at.
    #[serde(default)]
    pub timestamp: Option<MirrorTimestamp>,
}

/// `contracts/{id}/state` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractStateResponse {
    /// The matching slots, most recent first.
    pub state: Vec<ContractStateEntry>,
    /// Pagination.
    #[serde(default)]
    pub links: Links,
}

/// One fee schedule entry of `network/fees`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkFee {
    /// Gas cost in tinybar.
    pub gas: u64,
    /// The transaction type the fee applies to (`EthereumTransaction`, ...).
    pub transaction_type: String,
}

/// `network/fees` response.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkFeesResponse {
    /// Current fee schedule.
    pub fees: Vec<NetworkFee>,
    /// Schedule timestamp.
    #[serde(default)]
    pub timestamp: Option<MirrorTimestamp>,
}

/// An HBAR/cent exchange rate.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRate {
    /// Cents per `hbar_equivalent` HBAR.
    pub cent_equivalent: u64,
    /// HBAR per `cent_equivalent` cents.
    pub hbar_equivalent: u64,
    /// Expiry of this rate, unix seconds.
    #[serde(default)]
    pub expiration_time: Option<u64>,
}

/// `network/exchangerate` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRateResponse {
    /// Rate in force now.
    pub current_rate: ExchangeRate,
    /// Rate taking over at expiry.
    #[serde(default)]
    pub next_rate: Option<ExchangeRate>,
}

/// One element of the `transactions/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionDetail {
    /// The `shard.realm.num-sss-nnn` transaction id.
    pub transaction_id: String,
    /// Total fee charged, in tinybar.
    #[serde(default)]
    pub charged_tx_fee: i64,
    /// Final status name.
    #[serde(default)]
    pub result: Option<String>,
    /// Consensus timestamp.
    #[serde(default)]
    pub consensus_timestamp: Option<MirrorTimestamp>,
}

/// `transactions/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsResponse {
    /// The transaction and its child records.
    pub transactions: Vec<TransactionDetail>,
}

/// `tokens/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    /// Entity id of the token.
    pub token_id: String,
    /// Token name.
    #[serde(default)]
    pub name: Option<String>,
    /// Token symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Decimals, serialized as a string upstream.
    #[serde(default)]
    pub decimals: Option<String>,
}
