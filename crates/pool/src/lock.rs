use metrics::{counter, gauge};
use parking_lot::Mutex;
use relay_primitives::Address;
use rustc_hash::FxHashMap;
use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

/// Default bound on tracked senders.
const DEFAULT_CAPACITY: usize = 1000;

/// Default idle lifetime of a sender entry.
const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(15 * 60);

/// Default bound on how long an acquisition may wait.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(300);

/// Lock acquisition gave up after the configured timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out acquiring the sender lock")]
pub struct LockTimeout;

/// Opaque identifier tying a release to the acquisition that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Generates a fresh token.
    pub fn random() -> Self {
        Self(rand::random())
    }
}

struct LockEntry {
    /// One-permit semaphore acting as the sender's mutex.
    semaphore: Arc<Semaphore>,
    /// Tokens of live acquisitions. Holds at most one element; a set only so
    /// membership of a presented token is checkable.
    active: HashSet<SessionToken>,
    /// Recency marker for LRU eviction and the idle ttl.
    last_used: Instant,
}

impl LockEntry {
    fn new() -> Self {
        Self { semaphore: Arc::new(Semaphore::new(1)), active: HashSet::new(), last_used: Instant::now() }
    }
}

/// Serializes transaction submission per sender.
///
/// Entries are created lazily per sender and evicted by LRU (bounded
/// capacity) and idle ttl. Evicting a *locked* entry force-releases its
/// semaphore so waiters do not stall for the full acquire timeout; every
/// waiter therefore re-checks, after waking, that the entry it waited on is
/// still the live one and retries otherwise. A [`SessionToken`] witnesses one
/// acquisition; releasing with a token that is not in the active set — double
/// release, or release after eviction — is a no-op.
pub struct SenderLockRegistry {
    entries: Mutex<FxHashMap<Address, LockEntry>>,
    capacity: usize,
    entry_ttl: Duration,
    acquire_timeout: Duration,
}

impl std::fmt::Debug for SenderLockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderLockRegistry")
            .field("capacity", &self.capacity)
            .field("entry_ttl", &self.entry_ttl)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for SenderLockRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_ENTRY_TTL, DEFAULT_ACQUIRE_TIMEOUT)
    }
}

// === impl SenderLockRegistry ===

impl SenderLockRegistry {
    /// Creates a registry with explicit bounds.
    pub fn new(capacity: usize, entry_ttl: Duration, acquire_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            capacity,
            entry_ttl,
            acquire_timeout,
        }
    }

    /// Acquires the lock of `sender`, waiting up to the configured timeout.
    pub async fn acquire(&self, sender: Address) -> Result<SessionToken, LockTimeout> {
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            let semaphore = self.entry_semaphore(sender);

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                counter!("relay_sender_lock_timeouts_total").increment(1);
                return Err(LockTimeout)
            }

            let permit =
                match tokio::time::timeout(remaining, semaphore.clone().acquire_owned()).await {
                    Ok(Ok(permit)) => permit,
                    // the semaphore is never closed
                    Ok(Err(_)) => continue,
                    Err(_) => {
                        counter!("relay_sender_lock_timeouts_total").increment(1);
                        return Err(LockTimeout)
                    }
                };

            // the permit stays forgotten until release(); the token is the
            // only way to give it back
            let mut entries = self.entries.lock();
            match entries.get_mut(&sender) {
                Some(entry) if Arc::ptr_eq(&entry.semaphore, &semaphore) => {
                    permit.forget();
                    let token = SessionToken::random();
                    entry.active.insert(token);
                    entry.last_used = Instant::now();
                    trace!(target: "txpool", %sender, ?token, "sender lock acquired");
                    return Ok(token)
                }
                // the entry was evicted (and possibly recreated) while we
                // waited; the permit belongs to a dead semaphore — retry
                // against the live entry
                _ => {
                    drop(permit);
                    debug!(target: "txpool", %sender, "lock entry evicted mid-wait, retrying");
                }
            }
        }
    }

    /// Releases the lock of `sender` if `token` still witnesses a live
    /// acquisition. Idempotent.
    pub fn release(&self, sender: Address, token: SessionToken) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&sender) else {
            trace!(target: "txpool", %sender, "release for evicted entry ignored");
            return
        };
        if entry.active.remove(&token) {
            entry.last_used = Instant::now();
            entry.semaphore.add_permits(1);
            trace!(target: "txpool", %sender, ?token, "sender lock released");
        } else {
            trace!(target: "txpool", %sender, ?token, "release with unknown token ignored");
        }
    }

    /// Number of live acquisitions for `sender` (0 or 1).
    pub fn active_sessions(&self, sender: Address) -> usize {
        self.entries.lock().get(&sender).map(|e| e.active.len()).unwrap_or(0)
    }

    /// Number of tracked senders.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no senders are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the live semaphore of `sender`, creating the entry if needed
    /// and evicting expired or excess entries first.
    fn entry_semaphore(&self, sender: Address) -> Arc<Semaphore> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let expired: Vec<Address> = entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_used) >= self.entry_ttl)
            .map(|(sender, _)| *sender)
            .collect();
        for stale in expired {
            if let Some(entry) = entries.remove(&stale) {
                Self::drop_entry(stale, entry, "ttl");
            }
        }

        if !entries.contains_key(&sender) && entries.len() >= self.capacity {
            // evict the least recently used entry to make room
            if let Some(oldest) =
                entries.iter().min_by_key(|(_, entry)| entry.last_used).map(|(s, _)| *s)
            {
                if let Some(entry) = entries.remove(&oldest) {
                    Self::drop_entry(oldest, entry, "capacity");
                }
            }
        }

        let entry = entries.entry(sender).or_insert_with(LockEntry::new);
        entry.last_used = now;
        let semaphore = entry.semaphore.clone();
        gauge!("relay_sender_locks").set(entries.len() as f64);
        semaphore
    }

    /// Finalizes an evicted entry: a held lock is force-released so waiters
    /// wake up instead of running into the acquire timeout.
    fn drop_entry(sender: Address, mut entry: LockEntry, reason: &'static str) {
        if !entry.active.is_empty() {
            warn!(target: "txpool", %sender, reason, "evicting sender entry while its lock is held");
            entry.active.clear();
            entry.semaphore.add_permits(1);
            counter!("relay_sender_lock_forced_releases_total").increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SENDER: Address = address!("00000000000000000000000000000000000000aa");
    const OTHER: Address = address!("00000000000000000000000000000000000000bb");

    #[tokio::test]
    async fn acquire_release_roundtrip() {
        let registry = SenderLockRegistry::default();
        let token = registry.acquire(SENDER).await.unwrap();
        assert_eq!(registry.active_sessions(SENDER), 1);

        registry.release(SENDER, token);
        assert_eq!(registry.active_sessions(SENDER), 0);

        // the lock is free again
        let token = registry.acquire(SENDER).await.unwrap();
        registry.release(SENDER, token);
    }

    #[tokio::test]
    async fn double_release_is_a_noop() {
        let registry = SenderLockRegistry::default();
        let token = registry.acquire(SENDER).await.unwrap();
        registry.release(SENDER, token);
        registry.release(SENDER, token);
        registry.release(SENDER, SessionToken::random());

        // a second holder's lock is unaffected by the stale releases above
        let second = registry.acquire(SENDER).await.unwrap();
        assert_eq!(registry.active_sessions(SENDER), 1);
        registry.release(SENDER, second);
    }

    #[tokio::test]
    async fn at_most_one_session_per_sender() {
        let registry = Arc::new(SenderLockRegistry::new(
            DEFAULT_CAPACITY,
            DEFAULT_ENTRY_TTL,
            Duration::from_millis(50),
        ));
        let _held = registry.acquire(SENDER).await.unwrap();

        // a competing acquisition cannot get a second token
        assert_eq!(registry.acquire(SENDER).await, Err(LockTimeout));
        assert_eq!(registry.active_sessions(SENDER), 1);

        // but a different sender is unaffected
        let other = registry.acquire(OTHER).await.unwrap();
        registry.release(OTHER, other);
    }

    #[tokio::test]
    async fn waiters_are_serialized_in_turn() {
        let registry = Arc::new(SenderLockRegistry::default());
        let order = Arc::new(AtomicUsize::new(0));

        let first = registry.acquire(SENDER).await.unwrap();

        let waiter = {
            let registry = registry.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let token = registry.acquire(SENDER).await.unwrap();
                order.store(2, Ordering::SeqCst);
                registry.release(SENDER, token);
            })
        };

        tokio::task::yield_now().await;
        assert_eq!(order.load(Ordering::SeqCst), 0);

        order.store(1, Ordering::SeqCst);
        registry.release(SENDER, first);
        waiter.await.unwrap();
        assert_eq!(order.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn eviction_of_held_lock_releases_it() {
        // capacity 1: acquiring for a second sender evicts the first
        let registry =
            SenderLockRegistry::new(1, DEFAULT_ENTRY_TTL, Duration::from_millis(100));
        let stale = registry.acquire(SENDER).await.unwrap();

        let other = registry.acquire(OTHER).await.unwrap();
        assert_eq!(registry.len(), 1);

        // the evicted sender's lock was force-released: a fresh acquisition
        // succeeds immediately and the stale token no longer releases anything
        let fresh = registry.acquire(SENDER).await.unwrap();
        registry.release(SENDER, stale);
        assert_eq!(registry.active_sessions(SENDER), 1);

        registry.release(SENDER, fresh);
        registry.release(OTHER, other);
    }

    #[tokio::test]
    async fn idle_entries_expire() {
        let registry = SenderLockRegistry::new(
            DEFAULT_CAPACITY,
            Duration::from_millis(10),
            DEFAULT_ACQUIRE_TIMEOUT,
        );
        let token = registry.acquire(SENDER).await.unwrap();
        registry.release(SENDER, token);
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;

        // touching any sender sweeps the expired entry
        let other = registry.acquire(OTHER).await.unwrap();
        registry.release(OTHER, other);
        assert!(registry.entries.lock().get(&SENDER).is_none());
    }
}
