//! Pending-transaction bookkeeping for the relay.
//!
//! Two cooperating pieces:
//!
//! - [`PendingPool`] tracks every accepted-but-unreconciled submission, keyed
//!   by `(sender, nonce)`, with Ethereum replace-by-fee semantics and the
//!   read views the `txpool_*` namespace serves.
//! - [`SenderLockRegistry`] serializes submissions per sender while nonce
//!   ordering is enabled. Acquisitions hand out a [`SessionToken`] so a
//!   release always refers to the acquisition that produced it — a stale or
//!   double release is a no-op, never a foreign unlock.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

mod lock;
mod pool;

pub use lock::{LockTimeout, SenderLockRegistry, SessionToken};
pub use pool::{AdmitOutcome, PendingPool, PoolError, PoolTransaction};
