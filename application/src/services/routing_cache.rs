//! Routing decision cache.
//!
//! Bounded, time-expiring memo of [`RoutingDecision`]s keyed by
//! [`Fingerprint`]. A miss is always recoverable by asking the reasoning
//! module again, so the cache only ever affects latency.
//!
//! Eviction is FIFO by insertion time: re-inserting a key moves it to the
//! back, reading it does not.

use crate::config::RoutingCacheConfig;
use crate::ports::clock::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use conductor_domain::{Fingerprint, RoutingDecision};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Cache counters for operational tooling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to stay within `max_size`.
    pub evictions: u64,
    /// Entries dropped because they outlived `ttl`.
    pub expirations: u64,
}

struct CacheEntry {
    decision: RoutingDecision,
    inserted_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<Fingerprint, CacheEntry>,
    /// Insertion order. Items whose `seq` no longer matches the live entry
    /// are stale and skipped.
    order: VecDeque<(Fingerprint, u64)>,
    next_seq: u64,
    stats: CacheStats,
}

impl CacheInner {
    fn evict_oldest(&mut self) {
        while let Some((key, seq)) = self.order.pop_front() {
            let live = self.entries.get(&key).is_some_and(|e| e.seq == seq);
            if live {
                self.entries.remove(&key);
                self.stats.evictions += 1;
                return;
            }
        }
    }

    /// Drop stale order items once they outnumber live entries.
    fn compact(&mut self) {
        if self.order.len() > self.entries.len() * 2 + 16 {
            let entries = &self.entries;
            self.order
                .retain(|(key, seq)| entries.get(key).is_some_and(|e| e.seq == *seq));
        }
    }
}

pub struct RoutingCache {
    ttl: TimeDelta,
    max_size: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<CacheInner>,
}

impl RoutingCache {
    pub fn new(config: &RoutingCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: TimeDelta::from_std(config.ttl).unwrap_or(TimeDelta::MAX),
            max_size: config.max_size,
            clock,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a decision. Expired entries are evicted and reported as a miss.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<RoutingDecision> {
        let now = self.clock.now();
        let mut inner = self.lock();

        let fresh = match inner.entries.get(fingerprint) {
            None => None,
            Some(entry) => Some(now.signed_duration_since(entry.inserted_at) < self.ttl),
        };

        match fresh {
            Some(true) => {
                inner.stats.hits += 1;
                inner.entries.get(fingerprint).map(|e| e.decision.clone())
            }
            Some(false) => {
                inner.entries.remove(fingerprint);
                inner.stats.expirations += 1;
                inner.stats.misses += 1;
                debug!("Routing cache entry {} expired", fingerprint);
                None
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or overwrite. Evicts the oldest entry first when full.
    pub fn put(&self, fingerprint: Fingerprint, decision: RoutingDecision) {
        if self.max_size == 0 {
            return;
        }
        let now = self.clock.now();
        let mut inner = self.lock();

        if !inner.entries.contains_key(&fingerprint) && inner.entries.len() >= self.max_size {
            inner.evict_oldest();
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.push_back((fingerprint.clone(), seq));
        inner.entries.insert(
            fingerprint,
            CacheEntry {
                decision,
                inserted_at: now,
                seq,
            },
        );
        inner.compact();
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, including ones that expired but were not read yet.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::ManualClock;
    use conductor_domain::{ExecutionMode, WorkerId};
    use std::time::Duration;

    fn decision(worker: &str) -> RoutingDecision {
        RoutingDecision::new(vec![WorkerId::new(worker)], ExecutionMode::Delegated)
    }

    fn key(task: &str) -> Fingerprint {
        Fingerprint::compute(task, &[WorkerId::new("a")])
    }

    fn cache(ttl_secs: u64, max_size: usize) -> (RoutingCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let config = RoutingCacheConfig::default()
            .with_ttl(Duration::from_secs(ttl_secs))
            .with_max_size(max_size);
        (RoutingCache::new(&config, clock.clone()), clock)
    }

    #[test]
    fn test_get_after_put_within_ttl() {
        let (cache, clock) = cache(300, 8);
        cache.put(key("t"), decision("coder"));
        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get(&key("t")), Some(decision("coder")));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_evicted() {
        let (cache, clock) = cache(300, 8);
        cache.put(key("t"), decision("coder"));
        clock.advance(Duration::from_secs(300));
        assert_eq!(cache.get(&key("t")), None);
        assert_eq!(cache.len(), 0);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_size_never_exceeds_max() {
        let (cache, _clock) = cache(300, 3);
        for i in 0..50 {
            cache.put(key(&format!("task {}", i % 7)), decision("coder"));
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn test_evicts_oldest_by_insertion_not_access() {
        let (cache, clock) = cache(300, 2);
        cache.put(key("a"), decision("1"));
        clock.advance(Duration::from_secs(1));
        cache.put(key("b"), decision("2"));
        // Reading "a" does not refresh its position
        assert!(cache.get(&key("a")).is_some());
        cache.put(key("c"), decision("3"));

        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("b")), Some(decision("2")));
        assert_eq!(cache.get(&key("c")), Some(decision("3")));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_moves_key_to_back() {
        let (cache, _clock) = cache(300, 2);
        cache.put(key("a"), decision("1"));
        cache.put(key("b"), decision("2"));
        cache.put(key("a"), decision("1b"));
        cache.put(key("c"), decision("3"));

        assert_eq!(cache.get(&key("b")), None);
        assert_eq!(cache.get(&key("a")), Some(decision("1b")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_resets_ttl() {
        let (cache, clock) = cache(10, 4);
        cache.put(key("a"), decision("1"));
        clock.advance(Duration::from_secs(8));
        cache.put(key("a"), decision("2"));
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get(&key("a")), Some(decision("2")));
    }

    #[test]
    fn test_repeated_overwrites_stay_compact() {
        let (cache, _clock) = cache(300, 2);
        for _ in 0..1000 {
            cache.put(key("a"), decision("1"));
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.lock().order.len() <= 19);
    }

    #[test]
    fn test_clear() {
        let (cache, _clock) = cache(300, 4);
        cache.put(key("a"), decision("1"));
        cache.put(key("b"), decision("2"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&key("a")), None);
    }
}
