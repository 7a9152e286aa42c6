use crate::{ClientSupervisor, ConsensusError, FeeAccountant};
use relay_hbar_limiter::{ExecutionMode, HbarLimiter};
use relay_primitives::{EntityId, RequestContext};
use std::sync::Arc;
use tracing::{debug, warn};

/// Errors produced while staging call data as a file.
#[derive(Debug, thiserror::Error)]
pub enum FileStagingError {
    /// A consensus submission inside the staging group failed.
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
    /// The payload would need more append chunks than allowed.
    #[error("call data needs {needed} chunks, exceeding the configured maximum of {max}")]
    TooManyChunks {
        /// Chunks the payload splits into.
        needed: usize,
        /// The configured bound.
        max: usize,
    },
    /// The budget limiter stopped the staging group mid-way.
    #[error("HBAR budget exhausted while staging call data")]
    RateLimited,
    /// The staged file verified as empty.
    #[error("Created file is empty.")]
    EmptyFile,
    /// The staged file's size does not match the payload.
    #[error("staged file has size {actual}, expected {expected}")]
    SizeMismatch {
        /// Bytes expected after all appends.
        expected: u64,
        /// Bytes the file info reported.
        actual: u64,
    },
}

/// Stages oversized call data as a consensus-node file.
///
/// The `FileCreate` carries the first chunk, each following chunk is a
/// `FileAppend`; the appends run as a group and every committed member is
/// individually settled with the fee accountant, so a partial failure charges
/// only what actually executed. The staged file is verified by size before it
/// is handed back — a mismatch refuses the handle rather than letting the
/// consensus node validate a half-written file.
#[derive(Debug)]
pub struct FileStager {
    supervisor: Arc<ClientSupervisor>,
    limiter: Arc<HbarLimiter>,
    fees: Arc<FeeAccountant>,
    chunk_size: usize,
    max_chunks: usize,
}

// === impl FileStager ===

impl FileStager {
    /// Creates a stager splitting payloads into `chunk_size`d appends.
    pub fn new(
        supervisor: Arc<ClientSupervisor>,
        limiter: Arc<HbarLimiter>,
        fees: Arc<FeeAccountant>,
        chunk_size: usize,
        max_chunks: usize,
    ) -> Self {
        Self { supervisor, limiter, fees, chunk_size, max_chunks }
    }

    /// Stages `contents` and returns the verified file handle.
    pub async fn create_file(
        &self,
        contents: &[u8],
        sender: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<EntityId, FileStagingError> {
        let chunks: Vec<&[u8]> = contents.chunks(self.chunk_size.max(1)).collect();
        if chunks.len() > self.max_chunks {
            return Err(FileStagingError::TooManyChunks {
                needed: chunks.len(),
                max: self.max_chunks,
            })
        }

        let client = self.supervisor.client();

        let (file_id, response) = match client.create_file(chunks.first().copied().unwrap_or(&[])).await {
            Ok(created) => created,
            Err(err) => {
                self.report(&err);
                return Err(err.into())
            }
        };
        self.fees
            .settle(client.as_ref(), &response, "FileCreateTransaction", sender, ctx)
            .await;
        debug!(target: "hapi_client", %ctx, %file_id, chunks = chunks.len(), "call data file created");

        for chunk in chunks.iter().skip(1) {
            // budget exceedance mid-group aborts the remaining appends
            if self.limiter.should_limit(
                ExecutionMode::Transaction,
                "eth_sendRawTransaction",
                "FileAppendTransaction",
                sender,
                ctx,
            ) {
                warn!(target: "hapi_client", %ctx, %file_id, "aborting file staging, budget exhausted");
                self.cleanup(file_id).await;
                return Err(FileStagingError::RateLimited)
            }

            match client.append_file(file_id, chunk).await {
                Ok(response) => {
                    // only committed appends are charged
                    self.fees
                        .settle(client.as_ref(), &response, "FileAppendTransaction", sender, ctx)
                        .await;
                }
                Err(err) => {
                    self.report(&err);
                    self.cleanup(file_id).await;
                    return Err(err.into())
                }
            }
        }

        let info = client.file_info(file_id).await.inspect_err(|err| self.report(err))?;
        if info.size == 0 {
            self.cleanup(file_id).await;
            return Err(FileStagingError::EmptyFile)
        }
        if info.size != contents.len() as u64 {
            warn!(
                target: "hapi_client",
                %ctx, %file_id, expected = contents.len(), actual = info.size,
                "staged file size mismatch, refusing to submit"
            );
            self.cleanup(file_id).await;
            return Err(FileStagingError::SizeMismatch {
                expected: contents.len() as u64,
                actual: info.size,
            })
        }

        Ok(file_id)
    }

    /// Best-effort removal of a file the staging group abandoned.
    async fn cleanup(&self, file_id: EntityId) {
        if let Err(err) = self.supervisor.client().delete_file(file_id).await {
            warn!(target: "hapi_client", %file_id, %err, "failed to delete abandoned staging file");
        }
    }

    fn report(&self, err: &ConsensusError) {
        if let Some(status) = err.status() {
            self.supervisor.report_error(status.code());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ConsensusClient, EthereumTransactionRequest, FileInfo, Status, SupervisorConfig,
        TransactionRecord, TransactionResponse,
    };
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use relay_cache::{LocalCache, SharedCache};
    use relay_hbar_limiter::{LimiterBudget, SpendingPlanRegistry};
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicU64, AtomicUsize, Ordering},
        time::Duration,
    };

    /// In-memory consensus node: files are byte vectors, every transaction
    /// costs a fixed fee.
    #[derive(Debug, Default)]
    struct MockClient {
        files: Mutex<HashMap<EntityId, Vec<u8>>>,
        next_file: AtomicU64,
        appends: AtomicUsize,
        /// Fail the nth append (1-based) when set.
        fail_append: Option<usize>,
        /// Silently drop append payloads to simulate partial writes.
        drop_appends: bool,
    }

    impl MockClient {
        fn response(&self) -> TransactionResponse {
            TransactionResponse {
                transaction_id: "0.0.2@1700000000.000000001".into(),
                node_id: Some(EntityId::from_num(3)),
            }
        }
    }

    #[async_trait]
    impl ConsensusClient for MockClient {
        async fn execute_ethereum_transaction(
            &self,
            _request: &EthereumTransactionRequest,
        ) -> Result<TransactionResponse, ConsensusError> {
            Ok(self.response())
        }

        async fn create_file(
            &self,
            contents: &[u8],
        ) -> Result<(EntityId, TransactionResponse), ConsensusError> {
            let file_id = EntityId::from_num(1000 + self.next_file.fetch_add(1, Ordering::SeqCst));
            self.files.lock().insert(file_id, contents.to_vec());
            Ok((file_id, self.response()))
        }

        async fn append_file(
            &self,
            file_id: EntityId,
            contents: &[u8],
        ) -> Result<TransactionResponse, ConsensusError> {
            let nth = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_append == Some(nth) {
                return Err(ConsensusError::Precheck(Status::BUSY))
            }
            if !self.drop_appends {
                self.files.lock().get_mut(&file_id).unwrap().extend_from_slice(contents);
            }
            Ok(self.response())
        }

        async fn delete_file(
            &self,
            file_id: EntityId,
        ) -> Result<TransactionResponse, ConsensusError> {
            self.files.lock().remove(&file_id);
            Ok(self.response())
        }

        async fn file_info(&self, file_id: EntityId) -> Result<FileInfo, ConsensusError> {
            let size = self.files.lock().get(&file_id).map(|f| f.len() as u64).unwrap_or(0);
            Ok(FileInfo { file_id, size, deleted: false })
        }

        async fn transaction_record(
            &self,
            transaction_id: &str,
        ) -> Result<TransactionRecord, ConsensusError> {
            Ok(TransactionRecord {
                transaction_id: transaction_id.to_owned(),
                status: Status::SUCCESS,
                transaction_fee: 100,
                gas_used: 0,
            })
        }
    }

    fn limiter(budget: LimiterBudget) -> Arc<HbarLimiter> {
        let cache: SharedCache = Arc::new(LocalCache::default());
        let registry = SpendingPlanRegistry::new(cache.clone());
        Arc::new(HbarLimiter::new(cache, registry, budget, Duration::from_secs(86_400)))
    }

    fn ctx() -> RequestContext {
        RequestContext::new("req-test".into(), None)
    }

    fn stager(mock: &Arc<MockClient>, budget: LimiterBudget, max_chunks: usize) -> FileStager {
        let supervisor = Arc::new(ClientSupervisor::new(
            Box::new({
                let mock = mock.clone();
                move || mock.clone()
            }),
            SupervisorConfig {
                transaction_reset: 0,
                duration_reset: Duration::ZERO,
                error_reset: vec![],
            },
        ));
        let limiter = limiter(budget);
        let fees = Arc::new(FeeAccountant::new(limiter.clone(), None));
        FileStager::new(supervisor, limiter, fees, 4, max_chunks)
    }

    #[tokio::test]
    async fn stages_and_verifies_a_payload() {
        let mock = Arc::new(MockClient::default());
        let stager = stager(&mock, LimiterBudget::default(), 8);

        let payload = b"0123456789"; // 3 chunks of 4
        let file_id = stager.create_file(payload, None, &ctx()).await.unwrap();
        assert_eq!(mock.files.lock().get(&file_id).unwrap(), payload);
        assert_eq!(mock.appends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_append_aborts_and_cleans_up() {
        let mock = Arc::new(MockClient { fail_append: Some(2), ..MockClient::default() });
        let stager = stager(&mock, LimiterBudget::default(), 8);

        let err = stager.create_file(b"0123456789ab", None, &ctx()).await.unwrap_err();
        assert_matches!(err, FileStagingError::Consensus(ConsensusError::Precheck(_)));
        assert!(mock.files.lock().is_empty());
    }

    #[tokio::test]
    async fn dropped_appends_are_refused_by_size_check() {
        let mock = Arc::new(MockClient { drop_appends: true, ..MockClient::default() });
        let stager = stager(&mock, LimiterBudget::default(), 8);

        let err = stager.create_file(b"0123456789", None, &ctx()).await.unwrap_err();
        assert_matches!(err, FileStagingError::SizeMismatch { expected: 10, actual: 4 });
        assert!(mock.files.lock().is_empty());
    }

    #[tokio::test]
    async fn chunk_bound_is_enforced() {
        let mock = Arc::new(MockClient::default());
        let stager = stager(&mock, LimiterBudget::default(), 2);

        let err = stager.create_file(b"0123456789ab", None, &ctx()).await.unwrap_err();
        assert_matches!(err, FileStagingError::TooManyChunks { needed: 3, max: 2 });
        assert_eq!(mock.appends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn budget_exhaustion_mid_staging_aborts_remaining_appends() {
        let mock = Arc::new(MockClient::default());
        // the FileCreate settlement (100 tinybar) exhausts the global budget
        let stager = stager(&mock, LimiterBudget { global: 100, ..LimiterBudget::default() }, 8);

        let err = stager.create_file(b"0123456789", None, &ctx()).await.unwrap_err();
        assert_matches!(err, FileStagingError::RateLimited);
        assert_eq!(mock.appends.load(Ordering::SeqCst), 0);
        assert!(mock.files.lock().is_empty());
    }
}
