//! Bounded recency set of emitted entry ids.
//!
//! Overlapping tail windows return the same entries again; the cache keeps
//! the most recently seen ids so they are printed once. Eviction is by last
//! use, not by insertion: an id that keeps reappearing stays resident.

use std::collections::{BTreeMap, HashMap};

/// Default number of ids remembered.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1024;

/// Fixed-capacity LRU set.
#[derive(Debug, Clone)]
pub struct DedupCache {
    capacity: usize,
    tick: u64,
    /// id -> tick of last use
    ids: HashMap<String, u64>,
    /// tick of last use -> id, oldest first
    order: BTreeMap<u64, String>,
}

impl DedupCache {
    /// Create a cache. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tick: 0,
            ids: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the id is resident. Does not refresh recency.
    pub fn seen(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Insert or refresh an id, evicting the least recently used one when full.
    pub fn mark(&mut self, id: &str) {
        self.tick += 1;
        let tick = self.tick;

        if let Some(previous) = self.ids.get_mut(id) {
            self.order.remove(&*previous);
            *previous = tick;
            self.order.insert(tick, id.to_string());
            return;
        }

        if self.ids.len() >= self.capacity {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.ids.remove(&oldest);
            }
        }

        self.ids.insert(id.to_string(), tick);
        self.order.insert(tick, id.to_string());
    }

    /// Mark the id and report whether it was new.
    pub fn observe(&mut self, id: &str) -> bool {
        let fresh = !self.seen(id);
        self.mark(id);
        fresh
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_reports_new_ids_once() {
        let mut cache = DedupCache::new(4);
        assert!(cache.observe("a"));
        assert!(!cache.observe("a"));
        assert!(cache.observe("b"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = DedupCache::new(2);
        cache.mark("a");
        cache.mark("b");
        // Touch "a" so "b" becomes the oldest use.
        cache.mark("a");
        cache.mark("c");

        assert!(cache.seen("a"));
        assert!(!cache.seen("b"));
        assert!(cache.seen("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_seen_does_not_refresh() {
        let mut cache = DedupCache::new(2);
        cache.mark("a");
        cache.mark("b");
        assert!(cache.seen("a"));
        cache.mark("c");
        assert!(!cache.seen("a"));
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let mut cache = DedupCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.mark("a");
        cache.mark("b");
        assert!(!cache.seen("a"));
        assert!(cache.seen("b"));
    }
}
