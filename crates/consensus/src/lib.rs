//! The relay's write path to the consensus node.
//!
//! [`ConsensusClient`] is the seam over the node SDK (Ethereum transaction
//! execution, file staging, record queries). [`ClientSupervisor`] owns the
//! long-lived client handle and rebuilds it on transaction-count, wall-time or
//! error-code thresholds. [`FileStager`] offloads oversized call data as a
//! staged file before submission, and [`FeeAccountant`] settles the HBAR cost
//! of every committed operation against the budget limiter.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

mod client;
mod fees;
mod file;
mod supervisor;

pub use client::{
    ConsensusClient, ConsensusError, EthereumTransactionRequest, FileInfo, NoopConsensusClient,
    Status, TransactionRecord, TransactionResponse,
};
pub use fees::{mirror_transaction_id, FeeAccountant};
pub use file::{FileStager, FileStagingError};
pub use supervisor::{ClientSupervisor, ConsensusClientFactory, SupervisorConfig};
