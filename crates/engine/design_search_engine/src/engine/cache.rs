use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use tracing::trace;

/// Capacity-bounded memo with first-in first-out eviction.
///
/// Entries leave strictly in insertion order; lookups do not refresh an
/// entry's position. The map never holds more than `capacity` entries.
#[derive(Debug, Clone)]
pub struct BoundedProjectionCache<K, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    hits: u64,
    misses: u64,
}

impl<K, V> BoundedProjectionCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// `capacity` below one is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.min(4096)),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    /// Inserts `value`, evicting the oldest entries first when full.
    /// Replacing an existing key keeps its original queue position.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(old) => {
                    self.entries.remove(&old);
                    trace!(len = self.entries.len(), "projection cache eviction");
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Returns the cached value or computes, inserts and returns it. The flag
    /// is `true` on a hit. A failed computation leaves the cache untouched.
    pub fn get_or_insert<E>(
        &mut self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<(V, bool), E> {
        if let Some(found) = self.entries.get(&key) {
            self.hits += 1;
            return Ok((found.clone(), true));
        }
        let value = compute()?;
        self.misses += 1;
        self.insert(key, value.clone());
        Ok((value, false))
    }

    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    /// Lifetime `(hits, misses)` since creation or the last `clear`.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use proptest::prelude::*;

    use super::BoundedProjectionCache;

    fn fill(cache: &mut BoundedProjectionCache<char, u32>, key: char, value: u32) -> bool {
        let (_, hit) = cache
            .get_or_insert(key, || Ok::<_, Infallible>(value))
            .expect("infallible");
        hit
    }

    #[test]
    fn oldest_entry_is_evicted_first() {
        let mut cache = BoundedProjectionCache::new(2);
        fill(&mut cache, 'A', 1);
        fill(&mut cache, 'B', 2);
        fill(&mut cache, 'C', 3);
        assert!(!cache.contains(&'A'));
        assert!(cache.contains(&'B'));
        assert!(cache.contains(&'C'));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn hits_do_not_refresh_position() {
        let mut cache = BoundedProjectionCache::new(2);
        fill(&mut cache, 'A', 1);
        fill(&mut cache, 'B', 2);
        assert!(fill(&mut cache, 'A', 99));
        fill(&mut cache, 'C', 3);
        assert!(!cache.contains(&'A'));
        assert_eq!(cache.get(&'B'), Some(2));
        assert_eq!(cache.stats(), (1, 3));
    }

    #[test]
    fn failed_compute_is_not_cached() {
        let mut cache: BoundedProjectionCache<char, u32> = BoundedProjectionCache::new(4);
        let res = cache.get_or_insert('A', || Err("boom"));
        assert_eq!(res, Err("boom"));
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn size_never_exceeds_capacity(
            capacity in 1usize..16,
            keys in proptest::collection::vec(0u16..64, 0..300),
        ) {
            let mut cache = BoundedProjectionCache::new(capacity);
            for k in keys {
                let _ = cache.get_or_insert(k, || Ok::<_, Infallible>(u32::from(k)));
                prop_assert!(cache.len() <= capacity);
                prop_assert_eq!(cache.get(&k), Some(u32::from(k)));
            }
        }
    }
}
