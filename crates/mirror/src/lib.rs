//! Typed client for the mirror node's REST API.
//!
//! The mirror node is the relay's only read path: historical blocks, contract
//! results, execution actions, opcodes, logs, accounts and network rates all
//! come from here. The [`MirrorClient`] trait is the seam the rpc layer is
//! written against; [`HttpMirrorClient`] is the production implementation.
//!
//! A 404 from any endpoint is a first-class "not present" answer (`Ok(None)`
//! or an empty list), distinct from transport and server errors — callers
//! routinely probe for resources that do not exist yet.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

mod client;
mod types;

pub use client::{HttpMirrorClient, MirrorClient};
pub use types::*;

/// Errors produced by mirror-node calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MirrorError {
    /// The mirror node answered with a non-404 error status.
    #[error("mirror node returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The request never produced a response.
    #[error("mirror node transport error: {0}")]
    Transport(String),
    /// The response body did not match the expected shape.
    #[error("failed to decode mirror node response: {0}")]
    Decode(String),
}

/// Result alias for mirror-node calls.
pub type MirrorResult<T> = Result<T, MirrorError>;
