use crate::{wildcard_match, Cache};
use parking_lot::Mutex;
use schnellru::{ByLength, LruMap};
use std::time::{Duration, Instant};
use tracing::trace;

/// Default capacity of the in-process cache.
const DEFAULT_CAPACITY: u32 = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process [`Cache`] implementation.
///
/// LRU-bounded; expired entries are dropped lazily on access and swept when
/// keys are enumerated. Suitable for a single relay instance — a multi-instance
/// deployment swaps in a distributed implementation behind the same trait.
#[derive(Debug)]
pub struct LocalCache {
    entries: Mutex<LruMap<String, Entry, ByLength>>,
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// === impl LocalCache ===

impl LocalCache {
    /// Creates a cache bounded to `capacity` entries.
    pub fn new(capacity: u32) -> Self {
        Self { entries: Mutex::new(LruMap::new(ByLength::new(capacity))) }
    }
}

impl Cache for LocalCache {
    fn get(&self, key: &str, caller: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?.clone();
        if entry.is_expired(Instant::now()) {
            entries.remove(key);
            trace!(target: "cache", %key, %caller, "expired entry dropped on read");
            return None
        }
        Some(entry.value)
    }

    fn set(&self, key: &str, value: String, caller: &str, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        trace!(target: "cache", %key, %caller, ?ttl, "set");
        self.entries.lock().insert(key.to_owned(), Entry { value, expires_at });
    }

    fn delete(&self, key: &str, caller: &str) {
        trace!(target: "cache", %key, %caller, "delete");
        self.entries.lock().remove(key);
    }

    fn keys(&self, pattern: &str, caller: &str) -> Vec<String> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            entries.remove(&key);
        }

        let matched: Vec<String> = entries
            .iter()
            .map(|(key, _)| key.clone())
            .filter(|key| wildcard_match(pattern, key))
            .collect();
        trace!(target: "cache", %pattern, %caller, hits = matched.len(), "keys");
        matched
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn increment(&self, key: &str, delta: i64, caller: &str) -> i64 {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                (entry.value.parse::<i64>().unwrap_or(0), entry.expires_at)
            }
            _ => (0, None),
        };
        let next = current.saturating_add(delta);
        entries.insert(key.to_owned(), Entry { value: next.to_string(), expires_at });
        trace!(target: "cache", %key, %caller, %next, "increment");
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn set_get_delete() {
        let cache = LocalCache::default();
        cache.set("block:1", "0xabc".into(), "test", None);
        assert_eq!(cache.get("block:1", "test").as_deref(), Some("0xabc"));

        cache.delete("block:1", "test");
        assert_eq!(cache.get("block:1", "test"), None);
    }

    #[test]
    fn entries_expire() {
        let cache = LocalCache::default();
        cache.set("k", "v".into(), "test", Some(Duration::from_millis(10)));
        assert!(cache.get("k", "test").is_some());

        sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k", "test"), None);
    }

    #[test]
    fn keys_sweeps_and_filters() {
        let cache = LocalCache::default();
        cache.set("hbarSpendingPlan:p1", "{}".into(), "test", None);
        cache.set("hbarSpendingPlan:p2", "{}".into(), "test", None);
        cache.set("ethAddressPlan:0xa", "p1".into(), "test", None);
        cache.set("gone", "x".into(), "test", Some(Duration::from_millis(1)));

        sleep(Duration::from_millis(5));
        let mut keys = cache.keys("hbarSpendingPlan:*", "test");
        keys.sort();
        assert_eq!(keys, vec!["hbarSpendingPlan:p1", "hbarSpendingPlan:p2"]);
        assert!(cache.keys("gone", "test").is_empty());
    }

    #[test]
    fn increment_is_numeric_and_keeps_ttl() {
        let cache = LocalCache::default();
        assert_eq!(cache.increment("spent", 5, "test"), 5);
        assert_eq!(cache.increment("spent", 7, "test"), 12);
        assert_eq!(cache.get("spent", "test").as_deref(), Some("12"));

        cache.set("bounded", "1".into(), "test", Some(Duration::from_millis(10)));
        cache.increment("bounded", 1, "test");
        sleep(Duration::from_millis(20));
        assert_eq!(cache.get("bounded", "test"), None);
    }

    #[test]
    fn lru_eviction_respects_capacity() {
        let cache = LocalCache::new(2);
        cache.set("a", "1".into(), "test", None);
        cache.set("b", "2".into(), "test", None);
        cache.set("c", "3".into(), "test", None);
        assert_eq!(cache.get("a", "test"), None);
        assert!(cache.get("b", "test").is_some());
        assert!(cache.get("c", "test").is_some());
    }
}
