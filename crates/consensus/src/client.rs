use async_trait::async_trait;
use relay_primitives::{Bytes, EntityId};
use std::fmt::{self, Debug};

/// A consensus-node response status code.
///
/// Mirrors the network's response-code enumeration; only the handful the
/// relay branches on are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    /// Precheck passed.
    pub const OK: Self = Self(0);
    /// The payer cannot fund the transaction.
    pub const INSUFFICIENT_PAYER_BALANCE: Self = Self(10);
    /// The transaction id was already used.
    pub const DUPLICATE_TRANSACTION: Self = Self(11);
    /// The node is overloaded.
    pub const BUSY: Self = Self(12);
    /// The transaction reached consensus and succeeded.
    pub const SUCCESS: Self = Self(22);
    /// The platform failed to create the transaction.
    pub const PLATFORM_TRANSACTION_NOT_CREATED: Self = Self(26);

    /// The numeric code.
    pub const fn code(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OK => f.write_str("OK"),
            Self::INSUFFICIENT_PAYER_BALANCE => f.write_str("INSUFFICIENT_PAYER_BALANCE"),
            Self::DUPLICATE_TRANSACTION => f.write_str("DUPLICATE_TRANSACTION"),
            Self::BUSY => f.write_str("BUSY"),
            Self::SUCCESS => f.write_str("SUCCESS"),
            Self::PLATFORM_TRANSACTION_NOT_CREATED => {
                f.write_str("PLATFORM_TRANSACTION_NOT_CREATED")
            }
            Self(code) => write!(f, "STATUS_{code}"),
        }
    }
}

/// Errors produced by consensus-node interactions.
///
/// The two transport variants carry the exact message templates the rest of
/// the relay classifies on: a transient failure still allows sync-mode
/// reconciliation through the mirror node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    /// The request did not complete in time.
    #[error("timeout exceeded")]
    Timeout,
    /// The connection was severed mid-request.
    #[error("Connection dropped")]
    ConnectionDropped,
    /// The node rejected the transaction before consensus.
    #[error("precheck failed with status {0}")]
    Precheck(Status),
    /// The transaction reached consensus but failed.
    #[error("receipt status {0}")]
    ReceiptStatus(Status),
    /// Anything else the SDK surfaced.
    #[error("{0}")]
    Other(String),
}

// === impl ConsensusError ===

impl ConsensusError {
    /// Whether the submission may have reached the network despite the error.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionDropped)
    }

    /// The status code carried by the error, if any.
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Precheck(status) | Self::ReceiptStatus(status) => Some(*status),
            _ => None,
        }
    }
}

/// A submitted transaction's provisional identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    /// The `payer@seconds.nanos` transaction id, empty when the SDK failed to
    /// produce one.
    pub transaction_id: String,
    /// The node the transaction was submitted to.
    pub node_id: Option<EntityId>,
}

impl TransactionResponse {
    /// Whether the SDK failed to attach a transaction id.
    pub fn has_transaction_id(&self) -> bool {
        !self.transaction_id.is_empty()
    }
}

/// The committed record of a transaction, as the consensus node reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// The transaction id the record belongs to.
    pub transaction_id: String,
    /// Final status.
    pub status: Status,
    /// Total fee charged, in tinybar.
    pub transaction_fee: i64,
    /// Gas consumed by contract-call transactions.
    pub gas_used: u64,
}

/// Metadata of a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// The file's entity id.
    pub file_id: EntityId,
    /// Current size in bytes.
    pub size: u64,
    /// Whether the file was deleted.
    pub deleted: bool,
}

/// An `EthereumTransaction` submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthereumTransactionRequest {
    /// The RLP envelope; call data may have been stripped into a staged file.
    pub rlp_bytes: Bytes,
    /// Handle of the staged call-data file, when one was created.
    pub call_data_file: Option<EntityId>,
    /// Cap on the gas cost the operator fronts, in tinybar.
    pub max_gas_allowance: i64,
}

/// The consensus-node SDK surface the relay uses.
///
/// Interaction is stateless request/response; connection management lives in
/// the implementation, lifecycle policy in the [`super::ClientSupervisor`].
#[async_trait]
pub trait ConsensusClient: Debug + Send + Sync {
    /// Submits an `EthereumTransaction`.
    async fn execute_ethereum_transaction(
        &self,
        request: &EthereumTransactionRequest,
    ) -> Result<TransactionResponse, ConsensusError>;

    /// Submits a `FileCreate` holding `contents`, returning the new file id.
    async fn create_file(
        &self,
        contents: &[u8],
    ) -> Result<(EntityId, TransactionResponse), ConsensusError>;

    /// Submits a `FileAppend` of `contents` to `file_id`.
    async fn append_file(
        &self,
        file_id: EntityId,
        contents: &[u8],
    ) -> Result<TransactionResponse, ConsensusError>;

    /// Submits a `FileDelete` for `file_id`.
    async fn delete_file(&self, file_id: EntityId) -> Result<TransactionResponse, ConsensusError>;

    /// Runs a `FileInfoQuery` for `file_id`.
    async fn file_info(&self, file_id: EntityId) -> Result<FileInfo, ConsensusError>;

    /// Runs a `TransactionRecordQuery` for `transaction_id`.
    async fn transaction_record(
        &self,
        transaction_id: &str,
    ) -> Result<TransactionRecord, ConsensusError>;
}

/// A [`ConsensusClient`] for deployments without a write path.
///
/// The read-only gate rejects writes before they reach the client, so these
/// methods only fire if wiring is broken; they fail loudly rather than
/// pretending to submit.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopConsensusClient;

#[async_trait]
impl ConsensusClient for NoopConsensusClient {
    async fn execute_ethereum_transaction(
        &self,
        _request: &EthereumTransactionRequest,
    ) -> Result<TransactionResponse, ConsensusError> {
        Err(ConsensusError::Other("consensus client disabled".to_owned()))
    }

    async fn create_file(
        &self,
        _contents: &[u8],
    ) -> Result<(EntityId, TransactionResponse), ConsensusError> {
        Err(ConsensusError::Other("consensus client disabled".to_owned()))
    }

    async fn append_file(
        &self,
        _file_id: EntityId,
        _contents: &[u8],
    ) -> Result<TransactionResponse, ConsensusError> {
        Err(ConsensusError::Other("consensus client disabled".to_owned()))
    }

    async fn delete_file(&self, _file_id: EntityId) -> Result<TransactionResponse, ConsensusError> {
        Err(ConsensusError::Other("consensus client disabled".to_owned()))
    }

    async fn file_info(&self, _file_id: EntityId) -> Result<FileInfo, ConsensusError> {
        Err(ConsensusError::Other("consensus client disabled".to_owned()))
    }

    async fn transaction_record(
        &self,
        _transaction_id: &str,
    ) -> Result<TransactionRecord, ConsensusError> {
        Err(ConsensusError::Other("consensus client disabled".to_owned()))
    }
}
