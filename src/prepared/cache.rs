//! Plan cache
//!
//! Fingerprint-keyed LRU cache for prepared plans. Thread-safe; a hit moves
//! the entry to most-recently-used, so every operation takes the write
//! lock. TTL expiry is checked on read. Entries disappear through explicit
//! removal, type-level invalidation, capacity eviction, or expiry.

use super::{PreparedPlan, QueryFingerprint};
use crate::config::PlanCacheConfig;
use log::debug;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache observability counters.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hit rate over all lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry {
    plan: Arc<PreparedPlan>,
    inserted_at: Instant,
}

/// Thread-safe LRU plan cache with optional TTL.
pub struct PlanCache {
    entries: Mutex<LruCache<QueryFingerprint, CacheEntry>>,
    stats: Mutex<CacheStats>,
    ttl: Option<Duration>,
}

impl PlanCache {
    pub fn new(config: PlanCacheConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("capacity floor is 1"),
            )),
            stats: Mutex::new(CacheStats {
                capacity,
                ..CacheStats::default()
            }),
            ttl: config.ttl,
        }
    }

    /// Look up a prepared plan. Expired entries are dropped and counted as
    /// misses; a live hit becomes the most recently used entry.
    pub fn get(&self, fingerprint: &QueryFingerprint) -> Option<Arc<PreparedPlan>> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(fingerprint) {
            Some(entry) => match self.ttl {
                Some(ttl) => entry.inserted_at.elapsed() > ttl,
                None => false,
            },
            None => {
                let mut stats = self.stats.lock();
                stats.misses += 1;
                stats.size = entries.len();
                return None;
            }
        };

        if expired {
            entries.pop(fingerprint);
            let mut stats = self.stats.lock();
            stats.expirations += 1;
            stats.misses += 1;
            stats.size = entries.len();
            return None;
        }

        let plan = entries
            .get(fingerprint)
            .map(|entry| Arc::clone(&entry.plan));
        let mut stats = self.stats.lock();
        stats.hits += 1;
        stats.size = entries.len();
        plan
    }

    /// Insert or replace. At capacity, the least recently used entry is
    /// evicted.
    pub fn put(&self, fingerprint: QueryFingerprint, plan: Arc<PreparedPlan>) {
        let mut entries = self.entries.lock();
        let evicted = entries.push(
            fingerprint.clone(),
            CacheEntry {
                plan,
                inserted_at: Instant::now(),
            },
        );
        let mut stats = self.stats.lock();
        if let Some((old_key, _)) = evicted {
            if old_key != fingerprint {
                debug!("plan cache evicted an entry for '{}'", old_key.type_name);
                stats.evictions += 1;
            }
        }
        stats.size = entries.len();
    }

    /// Remove one entry.
    pub fn remove(&self, fingerprint: &QueryFingerprint) -> bool {
        let mut entries = self.entries.lock();
        let removed = entries.pop(fingerprint).is_some();
        self.stats.lock().size = entries.len();
        removed
    }

    /// Drop every plan for a record type (schema or index change).
    pub fn invalidate_type(&self, type_name: &str) -> usize {
        let mut entries = self.entries.lock();
        let doomed: Vec<QueryFingerprint> = entries
            .iter()
            .filter(|(fp, _)| fp.type_name == type_name)
            .map(|(fp, _)| fp.clone())
            .collect();
        for fp in &doomed {
            entries.pop(fp);
        }
        self.stats.lock().size = entries.len();
        if !doomed.is_empty() {
            debug!(
                "invalidated {} cached plans for '{}'",
                doomed.len(),
                type_name
            );
        }
        doomed.len()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.stats.lock().size = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().clone();
        stats.size = self.entries.lock().len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{next_plan_id, Operator, Plan, PlanCost};
    use crate::types::Timestamp;
    use std::collections::BTreeSet;
    use std::thread::sleep;

    fn fingerprint(type_name: &str, shape: &str) -> QueryFingerprint {
        QueryFingerprint {
            type_name: type_name.to_string(),
            condition_structure: shape.to_string(),
            sort_structure: String::new(),
            has_limit: false,
            has_offset: false,
        }
    }

    fn prepared(type_name: &str) -> Arc<PreparedPlan> {
        Arc::new(PreparedPlan {
            id: next_plan_id(),
            fingerprint: fingerprint(type_name, "x"),
            plan: Arc::new(Plan {
                id: next_plan_id(),
                type_name: type_name.to_string(),
                root: Operator::TableScan {
                    type_name: type_name.to_string(),
                    filter: None,
                    limit: None,
                },
                cost: PlanCost::default(),
                total_cost: 0.0,
                estimated_rows: 0.0,
                used_fields: BTreeSet::new(),
                used_indexes: Vec::new(),
                ordering_satisfied: true,
                post_filter: None,
                warnings: Vec::new(),
            }),
            bindings: Vec::new(),
            created_at: Timestamp::now(),
        })
    }

    fn cache(capacity: usize, ttl: Option<Duration>) -> PlanCache {
        let mut config = PlanCacheConfig::default().with_capacity(capacity);
        config.ttl = ttl;
        PlanCache::new(config)
    }

    #[test]
    fn test_hit_and_miss_accounting() {
        let cache = cache(4, None);
        let fp = fingerprint("user", "a");

        assert!(cache.get(&fp).is_none());
        cache.put(fp.clone(), prepared("user"));
        assert!(cache.get(&fp).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = cache(2, None);
        let fps: Vec<QueryFingerprint> =
            (0..3).map(|i| fingerprint("user", &format!("{i}"))).collect();

        cache.put(fps[0].clone(), prepared("user"));
        cache.put(fps[1].clone(), prepared("user"));
        // Touch the first so the second becomes LRU.
        assert!(cache.get(&fps[0]).is_some());
        cache.put(fps[2].clone(), prepared("user"));

        assert!(cache.get(&fps[0]).is_some());
        assert!(cache.get(&fps[1]).is_none());
        assert!(cache.get(&fps[2]).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_ttl_expiry_on_read() {
        let cache = cache(4, Some(Duration::from_millis(20)));
        let fp = fingerprint("user", "a");
        cache.put(fp.clone(), prepared("user"));
        assert!(cache.get(&fp).is_some());

        sleep(Duration::from_millis(40));
        assert!(cache.get(&fp).is_none());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_invalidate_type() {
        let cache = cache(8, None);
        cache.put(fingerprint("user", "a"), prepared("user"));
        cache.put(fingerprint("user", "b"), prepared("user"));
        cache.put(fingerprint("order", "a"), prepared("order"));

        assert_eq!(cache.invalidate_type("user"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&fingerprint("order", "a")).is_some());
    }

    #[test]
    fn test_remove() {
        let cache = cache(4, None);
        let fp = fingerprint("user", "a");
        cache.put(fp.clone(), prepared("user"));
        assert!(cache.remove(&fp));
        assert!(!cache.remove(&fp));
        assert!(cache.get(&fp).is_none());
    }

    #[test]
    fn test_replacing_same_key_is_not_eviction() {
        let cache = cache(2, None);
        let fp = fingerprint("user", "a");
        cache.put(fp.clone(), prepared("user"));
        cache.put(fp.clone(), prepared("user"));
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.len(), 1);
    }
}
