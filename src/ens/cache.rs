//! TTL-bounded resolution cache.
//!
//! Keys are direction-tagged and normalized so `Alice.eth` and `alice.eth`
//! share an entry. Eviction happens on the read path only: an expired entry
//! is deleted and reported as a miss the next time that exact key is read.

use alloy::primitives::Address;
use dashmap::DashMap;
use serde::Serialize;
use std::time::{Duration, Instant};

/// A resolution result, typed by direction so a forward hit hands back an
/// [`Address`] directly and never re-parses a stored string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    /// name → address; `None` records a definitive "no such name".
    Forward(Option<Address>),
    /// address → name; `None` records a definitive "no primary name".
    Reverse(Option<String>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    inserted_at: Instant,
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A live entry; its payload may itself be a cached "not found".
    Hit(CachedValue),
    /// No live entry for this key.
    Miss,
}

/// Point-in-time cache introspection.
///
/// `freshness_ratio` is fresh-entries over stored-entries computed at call
/// time. It is not a request hit-rate; the name is chosen to avoid implying
/// one.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub freshness_ratio: f64,
}

/// Concurrent name ↔ address cache shared across requests.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Key for forward (name → address) lookups.
    pub fn forward_key(name: &str) -> String {
        format!("ens:{}", name.to_lowercase())
    }

    /// Key for reverse (address → name) lookups.
    pub fn reverse_key(address: Address) -> String {
        format!("reverse:0x{address:x}")
    }

    /// Read a key, evicting it first if its TTL has elapsed.
    pub fn get(&self, key: &str) -> CacheLookup {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return CacheLookup::Hit(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        CacheLookup::Miss
    }

    /// Record a lookup result, including a definitive "not found".
    pub fn insert(&self, key: String, value: CachedValue) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let total_entries = self.entries.len();
        let fresh_entries = self
            .entries
            .iter()
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .count();
        let freshness_ratio = if total_entries > 0 {
            fresh_entries as f64 / total_entries as f64
        } else {
            0.0
        };
        CacheStats {
            total_entries,
            fresh_entries,
            freshness_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn addr() -> Address {
        "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
            .parse()
            .unwrap()
    }

    #[test]
    fn miss_then_hit() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        let key = ResolutionCache::forward_key("alice.eth");
        assert_eq!(cache.get(&key), CacheLookup::Miss);
        cache.insert(key.clone(), CachedValue::Forward(Some(addr())));
        assert_eq!(
            cache.get(&key),
            CacheLookup::Hit(CachedValue::Forward(Some(addr())))
        );
    }

    #[test]
    fn forward_hit_returns_the_address_as_stored() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        let key = ResolutionCache::forward_key("alice.eth");
        cache.insert(key.clone(), CachedValue::Forward(Some(addr())));
        let CacheLookup::Hit(CachedValue::Forward(Some(got))) = cache.get(&key) else {
            panic!("expected a forward hit");
        };
        assert_eq!(got, addr());
    }

    #[test]
    fn cached_not_found_is_a_hit() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        let key = ResolutionCache::forward_key("nobody.eth");
        cache.insert(key.clone(), CachedValue::Forward(None));
        assert_eq!(
            cache.get(&key),
            CacheLookup::Hit(CachedValue::Forward(None))
        );
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let cache = ResolutionCache::new(Duration::from_millis(10));
        let key = ResolutionCache::forward_key("alice.eth");
        cache.insert(key.clone(), CachedValue::Forward(Some(addr())));
        sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&key), CacheLookup::Miss);
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn keys_are_direction_tagged_and_normalized() {
        assert_eq!(
            ResolutionCache::forward_key("Alice.ETH"),
            ResolutionCache::forward_key("alice.eth")
        );
        assert_eq!(
            ResolutionCache::reverse_key(addr()),
            "reverse:0xd8da6bf26964af9d7eed9e03e53415d37aa96045"
        );
        assert_ne!(
            ResolutionCache::forward_key("alice.eth"),
            "reverse:alice.eth"
        );
    }

    #[test]
    fn freshness_ratio_counts_stored_entries_only() {
        let cache = ResolutionCache::new(Duration::from_millis(50));
        cache.insert("ens:a.eth".to_string(), CachedValue::Forward(Some(addr())));
        sleep(Duration::from_millis(60));
        cache.insert("ens:b.eth".to_string(), CachedValue::Forward(Some(addr())));

        // The stale entry is still stored (no read has evicted it), so the
        // ratio is 1 fresh of 2 stored.
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.fresh_entries, 1);
        assert!((stats.freshness_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = ResolutionCache::new(Duration::from_secs(300));
        cache.insert("ens:a.eth".to_string(), CachedValue::Forward(Some(addr())));
        cache.insert("ens:b.eth".to_string(), CachedValue::Forward(None));
        cache.clear();
        assert_eq!(cache.stats().total_entries, 0);
        assert_eq!(cache.get("ens:a.eth"), CacheLookup::Miss);
    }

    #[test]
    fn empty_cache_reports_zero_ratio() {
        let cache = ResolutionCache::new(Duration::from_secs(1));
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.freshness_ratio, 0.0);
    }
}
