// =============================================================================
// SignalCache — short-TTL cache for expensive per-cycle computations
// =============================================================================
//
// Grounded on `regime/detector.rs`'s `RwLock<Option<T>>` + `Instant`
// freshness check (the same shape used by `macro_regime::MacroCache`), made
// generic here so GEX summaries, direction assessments, and any other
// per-underlying snapshot share one cache implementation instead of each
// module rolling its own.
//
// TTL fixed at 5 minutes: short enough that a stale GEX/assessment snapshot
// never survives into the next options cycle tick under the default 60s
// cadence, long enough to avoid recomputing Black-Scholes across the whole
// chain on every tick when nothing has changed.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const SIGNAL_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct Entry<T> {
    value: T,
    at: Instant,
}

/// A keyed cache of `T` snapshots, each independently timestamped.
pub struct SignalCache<T: Clone> {
    entries: RwLock<HashMap<String, Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> SignalCache<T> {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl: SIGNAL_CACHE_TTL }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    /// Returns the cached value for `key` if present and still within TTL.
    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: &str, value: T) {
        self.entries.write().insert(key.to_string(), Entry { value, at: Instant::now() });
    }

    /// Remove entries past TTL, bounding memory for long-running processes
    /// watching a changing underlying universe.
    pub fn sweep_expired(&self) {
        let ttl = self.ttl;
        self.entries.write().retain(|_, e| e.at.elapsed() < ttl);
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.write().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for SignalCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_on_empty_cache() {
        let cache: SignalCache<i32> = SignalCache::new();
        assert!(cache.get("SPY").is_none());
    }

    #[test]
    fn put_then_get_hits() {
        let cache: SignalCache<i32> = SignalCache::new();
        cache.put("SPY", 42);
        assert_eq!(cache.get("SPY"), Some(42));
    }

    #[test]
    fn expired_entry_misses() {
        let cache: SignalCache<i32> = SignalCache::with_ttl(Duration::from_millis(1));
        cache.put("SPY", 42);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("SPY").is_none());
    }

    #[test]
    fn sweep_removes_expired_entries_only() {
        let cache: SignalCache<i32> = SignalCache::with_ttl(Duration::from_millis(1));
        cache.put("SPY", 1);
        std::thread::sleep(Duration::from_millis(5));
        cache.put("QQQ", 2);
        cache.sweep_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("QQQ"), Some(2));
    }

    #[test]
    fn invalidate_removes_single_key() {
        let cache: SignalCache<i32> = SignalCache::new();
        cache.put("SPY", 1);
        cache.put("QQQ", 2);
        cache.invalidate("SPY");
        assert!(cache.get("SPY").is_none());
        assert!(cache.get("QQQ").is_some());
    }
}
