//! Shared cache for the relay.
//!
//! All mutable relay state lives behind the [`Cache`] trait: memoized
//! mirror-node reads, spending plans and their address associations, and the
//! counters the budget limiter keeps. Keys follow the collection-prefix
//! pattern `{collection}:{identifier}[:{sub-key}]`.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

mod local;
mod memoize;

pub use local::LocalCache;
pub use memoize::{CachePolicy, NamedField, SkipNamedParam, SkipParam};

use std::{fmt::Debug, sync::Arc, time::Duration};

/// A string-keyed cache with per-entry time-to-live.
///
/// The trait is the persistence contract of the whole relay: nothing is ever
/// written to disk, so an implementation may be process-local or distributed
/// as long as it honors the ttl and the atomicity of [`Cache::increment`].
pub trait Cache: Debug + Send + Sync {
    /// Returns the live value under `key`, if any.
    fn get(&self, key: &str, caller: &str) -> Option<String>;

    /// Stores `value` under `key`. `ttl` of `None` means no expiry.
    fn set(&self, key: &str, value: String, caller: &str, ttl: Option<Duration>);

    /// Removes the entry under `key`.
    fn delete(&self, key: &str, caller: &str);

    /// Returns all live keys matching `pattern` (`*` wildcards).
    fn keys(&self, pattern: &str, caller: &str) -> Vec<String>;

    /// Drops every entry.
    fn clear(&self);

    /// Atomically adds `delta` to the integer stored under `key` and returns
    /// the new value. A missing or non-numeric entry counts as zero; the
    /// entry's remaining ttl is preserved.
    fn increment(&self, key: &str, delta: i64, caller: &str) -> i64;
}

/// Shared handle to a cache implementation.
pub type SharedCache = Arc<dyn Cache>;

/// Matches `s` against `pattern`, where `*` matches any (possibly empty) run
/// of characters. This is the key-pattern dialect of [`Cache::keys`].
pub fn wildcard_match(pattern: &str, s: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();

    let Some(mut rest) = s.strip_prefix(first) else { return false };
    let mut last: Option<&str> = None;
    for part in parts {
        last = Some(part);
        if part.is_empty() {
            continue
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    match last {
        // no '*' at all: the prefix must have consumed everything
        None => rest.is_empty(),
        Some("") => true,
        Some(part) => rest.is_empty() || s.ends_with(part),
    }
}
