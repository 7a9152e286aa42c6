//! Environment-keyed configuration for the relay.
//!
//! Every knob the relay recognizes is read from the process environment once
//! at startup into a [`RelayConfig`] value which is then shared immutably.
//! Durations are accepted either as plain milliseconds or in humantime form
//! (`1h`, `90s`).

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

use relay_primitives::EntityId;
use std::{env, str::FromStr, time::Duration};

/// Errors produced while reading the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required key is missing.
    #[error("missing required configuration key {0}")]
    Missing(&'static str),
    /// A key holds a value that does not parse.
    #[error("invalid value {value:?} for configuration key {key}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// The raw value found in the environment.
        value: String,
    },
}

/// Encoding of the operator private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorKeyFormat {
    /// DER-encoded key, the SDK default.
    #[default]
    Der,
    /// Raw hex ED25519 key.
    HexEd25519,
    /// Raw hex ECDSA (secp256k1) key.
    HexEcdsa,
}

impl FromStr for OperatorKeyFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DER" => Ok(Self::Der),
            "HEX_ED25519" => Ok(Self::HexEd25519),
            "HEX_ECDSA" => Ok(Self::HexEcdsa),
            _ => Err(()),
        }
    }
}

/// Where the spending-plan configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendingPlansSource {
    /// No preconfigured plans.
    None,
    /// The configuration value itself is the JSON document.
    Inline(String),
    /// The configuration value names a JSON file.
    File(String),
}

/// The relay's complete configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// EIP-155 chain id the relay fronts.
    pub chain_id: u64,
    /// Named Hedera network (`mainnet`, `testnet`, `previewnet` or custom).
    pub hedera_network: String,
    /// Operator account paying for consensus submissions.
    pub operator_id: Option<EntityId>,
    /// Operator private key material.
    pub operator_key: Option<String>,
    /// Encoding of [`Self::operator_key`].
    pub operator_key_format: OperatorKeyFormat,
    /// When set, every write method fails with an unsupported-operation error.
    pub read_only: bool,
    /// Gates the `debug_*` namespace.
    pub debug_api_enabled: bool,
    /// Gates the opcode-logger tracer inside the debug namespace.
    pub opcode_logger_enabled: bool,
    /// Gates the `txpool_*` namespace.
    pub txpool_api_enabled: bool,
    /// Whether accepted transactions are tracked in the pending pool.
    pub enable_tx_pool: bool,
    /// Return the locally computed hash immediately and reconcile with the
    /// mirror node in the background.
    pub use_async_tx_processing: bool,
    /// Serialize same-sender submissions through the lock registry.
    pub enable_nonce_ordering: bool,
    /// Submit oversized call data inline instead of staging it as a file.
    pub jumbo_tx_enabled: bool,
    /// Consensus client is rebuilt after this many transactions (0 = never).
    pub hapi_client_transaction_reset: u64,
    /// Consensus client is rebuilt after this much wall time (0 = never).
    pub hapi_client_duration_reset: Duration,
    /// Consensus status codes that trigger a client rebuild.
    pub hapi_client_error_reset: Vec<i32>,
    /// Chunk size for `FileAppend` staging.
    pub file_append_chunk_size: usize,
    /// Maximum number of `FileAppend` chunks per staged payload.
    pub file_append_max_chunks: usize,
    /// Budget window of the HBAR limiter.
    pub hbar_rate_limit_duration: Duration,
    /// Preconfigured spending plans (inline JSON or a filename).
    pub hbar_spending_plans: SpendingPlansSource,
    /// Port the JSON-RPC server binds.
    pub server_port: u16,
    /// Base url of the mirror node REST API.
    pub mirror_node_url: String,
    /// Static gas price override, in tinybars per gas.
    pub gas_price_tinybars: Option<u64>,
    /// Gas attributed to transactions without an execution trace.
    pub tx_default_gas: u64,
    /// Upper bound on the gas limit of accepted transactions.
    pub max_gas_limit: u64,
    /// Cap on the fee the operator fronts per transaction, in tinybar.
    pub max_transaction_fee_tinybars: i64,
    /// Upper bound on the raw transaction payload size, in bytes.
    pub send_raw_transaction_size_limit: usize,
    /// Number of mirror-node polls during synchronous hash reconciliation.
    pub mirror_poll_retries: u32,
    /// Delay between mirror-node reconciliation polls.
    pub mirror_poll_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chain_id: 298,
            hedera_network: "local".to_owned(),
            operator_id: None,
            operator_key: None,
            operator_key_format: OperatorKeyFormat::default(),
            read_only: false,
            debug_api_enabled: false,
            opcode_logger_enabled: false,
            txpool_api_enabled: false,
            enable_tx_pool: true,
            use_async_tx_processing: true,
            enable_nonce_ordering: true,
            jumbo_tx_enabled: false,
            hapi_client_transaction_reset: 50,
            hapi_client_duration_reset: Duration::from_secs(3600),
            hapi_client_error_reset: vec![21, 50],
            file_append_chunk_size: 5120,
            file_append_max_chunks: 20,
            hbar_rate_limit_duration: Duration::from_secs(86_400),
            hbar_spending_plans: SpendingPlansSource::None,
            server_port: 7546,
            mirror_node_url: "http://127.0.0.1:5551".to_owned(),
            gas_price_tinybars: None,
            tx_default_gas: 400_000,
            max_gas_limit: 15_000_000,
            max_transaction_fee_tinybars: 10_000_000_000,
            send_raw_transaction_size_limit: 131_072,
            mirror_poll_retries: 10,
            mirror_poll_interval: Duration::from_secs(1),
        }
    }
}

// === impl RelayConfig ===

impl RelayConfig {
    /// Reads the configuration from the process environment, falling back to
    /// defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = read("CHAIN_ID")? {
            config.chain_id = parse_quantity("CHAIN_ID", &v)?;
        }
        if let Some(v) = read("HEDERA_NETWORK")? {
            config.hedera_network = v;
        }
        if let Some(v) = read("OPERATOR_ID_MAIN")? {
            config.operator_id =
                Some(v.parse().map_err(|_| ConfigError::Invalid { key: "OPERATOR_ID_MAIN", value: v })?);
        }
        if let Some(v) = read("OPERATOR_KEY_MAIN")? {
            config.operator_key = Some(v);
        }
        if let Some(v) = read("OPERATOR_KEY_FORMAT")? {
            config.operator_key_format = v
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "OPERATOR_KEY_FORMAT", value: v })?;
        }

        config.read_only = read_bool("READ_ONLY", config.read_only)?;
        config.debug_api_enabled = read_bool("DEBUG_API_ENABLED", config.debug_api_enabled)?;
        config.opcode_logger_enabled =
            read_bool("OPCODELOGGER_ENABLED", config.opcode_logger_enabled)?;
        config.txpool_api_enabled = read_bool("TXPOOL_API_ENABLED", config.txpool_api_enabled)?;
        config.enable_tx_pool = read_bool("ENABLE_TX_POOL", config.enable_tx_pool)?;
        config.use_async_tx_processing =
            read_bool("USE_ASYNC_TX_PROCESSING", config.use_async_tx_processing)?;
        config.enable_nonce_ordering =
            read_bool("ENABLE_NONCE_ORDERING", config.enable_nonce_ordering)?;
        config.jumbo_tx_enabled = read_bool("JUMBO_TX_ENABLED", config.jumbo_tx_enabled)?;

        if let Some(v) = read("HAPI_CLIENT_TRANSACTION_RESET")? {
            config.hapi_client_transaction_reset =
                parse_number("HAPI_CLIENT_TRANSACTION_RESET", &v)?;
        }
        if let Some(v) = read("HAPI_CLIENT_DURATION_RESET")? {
            config.hapi_client_duration_reset = parse_duration("HAPI_CLIENT_DURATION_RESET", &v)?;
        }
        if let Some(v) = read("HAPI_CLIENT_ERROR_RESET")? {
            config.hapi_client_error_reset = parse_error_codes("HAPI_CLIENT_ERROR_RESET", &v)?;
        }
        if let Some(v) = read("FILE_APPEND_CHUNK_SIZE")? {
            config.file_append_chunk_size = parse_number("FILE_APPEND_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = read("FILE_APPEND_MAX_CHUNKS")? {
            config.file_append_max_chunks = parse_number("FILE_APPEND_MAX_CHUNKS", &v)?;
        }
        if let Some(v) = read("HBAR_RATE_LIMIT_DURATION")? {
            config.hbar_rate_limit_duration = parse_duration("HBAR_RATE_LIMIT_DURATION", &v)?;
        }
        if let Some(v) = read("HBAR_SPENDING_PLANS_CONFIG")? {
            // a value that parses as JSON is the document itself, anything
            // else names a file
            let trimmed = v.trim_start();
            config.hbar_spending_plans = if trimmed.starts_with('[') || trimmed.starts_with('{') {
                SpendingPlansSource::Inline(v)
            } else {
                SpendingPlansSource::File(v)
            };
        }

        if let Some(v) = read("SERVER_PORT")? {
            config.server_port = parse_number("SERVER_PORT", &v)?;
        }
        if let Some(v) = read("MIRROR_NODE_URL")? {
            config.mirror_node_url = v;
        }
        if let Some(v) = read("GAS_PRICE_TINYBARS")? {
            config.gas_price_tinybars = Some(parse_number("GAS_PRICE_TINYBARS", &v)?);
        }
        if let Some(v) = read("TX_DEFAULT_GAS")? {
            config.tx_default_gas = parse_number("TX_DEFAULT_GAS", &v)?;
        }
        if let Some(v) = read("MAX_GAS_LIMIT")? {
            config.max_gas_limit = parse_number("MAX_GAS_LIMIT", &v)?;
        }
        if let Some(v) = read("MAX_TRANSACTION_FEE")? {
            config.max_transaction_fee_tinybars = parse_number("MAX_TRANSACTION_FEE", &v)?;
        }
        if let Some(v) = read("SEND_RAW_TRANSACTION_SIZE_LIMIT")? {
            config.send_raw_transaction_size_limit =
                parse_number("SEND_RAW_TRANSACTION_SIZE_LIMIT", &v)?;
        }
        if let Some(v) = read("MIRROR_POLL_RETRIES")? {
            config.mirror_poll_retries = parse_number("MIRROR_POLL_RETRIES", &v)?;
        }
        if let Some(v) = read("MIRROR_POLL_INTERVAL")? {
            config.mirror_poll_interval = parse_duration("MIRROR_POLL_INTERVAL", &v)?;
        }

        Ok(config)
    }

    /// Whether client reinitialization is disabled entirely.
    ///
    /// Reinit is off only when all three thresholds are unset; a deployment
    /// that zeroes them keeps one client handle for the process lifetime.
    pub fn hapi_reinit_disabled(&self) -> bool {
        self.hapi_client_transaction_reset == 0 &&
            self.hapi_client_duration_reset.is_zero() &&
            self.hapi_client_error_reset.is_empty()
    }
}

fn read(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(v) if v.is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(ConfigError::Invalid { key, value: "<non-unicode>".to_owned() })
        }
    }
}

fn read_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match read(key)? {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid { key, value: value.to_owned() })
}

/// Chain ids are conventionally written as hex (`0x12a`), but decimal is
/// accepted too.
fn parse_quantity(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| ConfigError::Invalid { key, value: value.to_owned() })
}

/// Accepts plain milliseconds or humantime (`1h`, `90s`).
fn parse_duration(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    if let Ok(millis) = value.parse::<u64>() {
        return Ok(Duration::from_millis(millis))
    }
    humantime::parse_duration(value)
        .map_err(|_| ConfigError::Invalid { key, value: value.to_owned() })
}

fn parse_error_codes(key: &'static str, value: &str) -> Result<Vec<i32>, ConfigError> {
    value
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim().parse().map_err(|_| ConfigError::Invalid { key, value: value.to_owned() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_are_sane() {
        let config = RelayConfig::default();
        assert_eq!(config.chain_id, 298);
        assert!(config.enable_nonce_ordering);
        assert!(!config.hapi_reinit_disabled());
        assert_eq!(config.file_append_chunk_size, 5120);
    }

    #[test]
    fn reinit_disabled_requires_all_three() {
        let mut config = RelayConfig::default();
        config.hapi_client_transaction_reset = 0;
        config.hapi_client_duration_reset = Duration::ZERO;
        assert!(!config.hapi_reinit_disabled());

        config.hapi_client_error_reset.clear();
        assert!(config.hapi_reinit_disabled());
    }

    #[test]
    fn duration_parsing_accepts_millis_and_humantime() {
        assert_eq!(parse_duration("K", "1500").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("K", "1h").unwrap(), Duration::from_secs(3600));
        assert_matches!(parse_duration("K", "soon"), Err(ConfigError::Invalid { .. }));
    }

    #[test]
    fn chain_id_hex_or_decimal() {
        assert_eq!(parse_quantity("CHAIN_ID", "0x12a").unwrap(), 298);
        assert_eq!(parse_quantity("CHAIN_ID", "298").unwrap(), 298);
        assert_matches!(parse_quantity("CHAIN_ID", "mainnet"), Err(ConfigError::Invalid { .. }));
    }

    #[test]
    fn error_code_list_parsing() {
        assert_eq!(parse_error_codes("K", "[21, 50]").unwrap(), vec![21, 50]);
        assert_eq!(parse_error_codes("K", "21,50").unwrap(), vec![21, 50]);
        assert_eq!(parse_error_codes("K", "[]").unwrap(), Vec::<i32>::new());
        assert_matches!(parse_error_codes("K", "[a]"), Err(ConfigError::Invalid { .. }));
    }
}
