//! Memoization of dashboard results by filter.
//!
//! The cache index is a bounded LRU behind a [`Mutex`]. Each entry is a
//! once-initialized slot: the first request for a filter computes into the
//! slot while later requests for the same filter block on it and share the
//! result. The lock is never held during computation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crash_dash_analytics_models::DashboardResults;
use crash_dash_query_models::Filter;

type Slot = Arc<OnceLock<Arc<DashboardResults>>>;

/// Hit and miss counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Bounded LRU cache of [`DashboardResults`] keyed by [`Filter`].
#[derive(Debug)]
pub struct ResultCache {
    index: Option<Mutex<Lru<Filter, Slot>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// A cache holding at most `capacity` results. A capacity of zero
    /// disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            index: (capacity > 0).then(|| Mutex::new(Lru::new(capacity))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.index.is_some()
    }

    /// Returns the cached results for `filter`, computing them with
    /// `compute` on a miss.
    pub fn get_or_compute(
        &self,
        filter: &Filter,
        compute: impl FnOnce() -> DashboardResults,
    ) -> Arc<DashboardResults> {
        let Some(index) = &self.index else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Arc::new(compute());
        };

        let slot = {
            let mut lru = index.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = lru.get(filter) {
                Arc::clone(slot)
            } else {
                let slot = Slot::default();
                lru.put(filter.clone(), Arc::clone(&slot));
                slot
            }
        };

        let mut computed = false;
        let results = slot.get_or_init(|| {
            computed = true;
            Arc::new(compute())
        });

        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
            log::debug!("Result cache miss for {filter}");
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Result cache hit for {filter}");
        }

        Arc::clone(results)
    }

    /// Number of filters currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.as_ref().map_or(0, |index| {
            index.lock().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Doubly-linked LRU list threaded through a slab of entries.
#[derive(Debug)]
struct Lru<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    entries: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K: Eq + Hash + Clone, V> Lru<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    /// Looks up `key`, marking it most recently used.
    fn get(&mut self, key: &K) -> Option<&V> {
        let index = *self.map.get(key)?;
        self.move_to_front(index);
        self.entries[index].as_ref().map(|e| &e.value)
    }

    fn put(&mut self, key: K, value: V) {
        if let Some(&index) = self.map.get(&key) {
            if let Some(entry) = &mut self.entries[index] {
                entry.value = value;
            }
            self.move_to_front(index);
            return;
        }

        if self.map.len() >= self.capacity {
            self.evict();
        }

        let entry = Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let index = if let Some(index) = self.free.pop() {
            self.entries[index] = Some(entry);
            index
        } else {
            self.entries.push(Some(entry));
            self.entries.len() - 1
        };
        self.map.insert(key, index);
        self.push_front(index);
    }

    fn evict(&mut self) {
        let Some(index) = self.tail else {
            return;
        };
        self.unlink(index);
        if let Some(entry) = self.entries[index].take() {
            self.map.remove(&entry.key);
        }
        self.free.push(index);
    }

    fn push_front(&mut self, index: usize) {
        if let Some(entry) = &mut self.entries[index] {
            entry.prev = None;
            entry.next = self.head;
        }
        if let Some(old_head) = self.head
            && let Some(entry) = &mut self.entries[old_head]
        {
            entry.prev = Some(index);
        }
        self.head = Some(index);
        if self.tail.is_none() {
            self.tail = Some(index);
        }
    }

    fn unlink(&mut self, index: usize) {
        let Some((prev, next)) = self.entries[index].as_ref().map(|e| (e.prev, e.next)) else {
            return;
        };

        match prev {
            Some(prev) => {
                if let Some(entry) = &mut self.entries[prev] {
                    entry.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(entry) = &mut self.entries[next] {
                    entry.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn move_to_front(&mut self, index: usize) {
        if self.head != Some(index) {
            self.unlink(index);
            self.push_front(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    use crash_dash_analytics_models::Summary;
    use crash_dash_collision_models::Borough;

    use super::*;

    fn results(filter: &Filter) -> DashboardResults {
        DashboardResults {
            filter: filter.clone(),
            summary: Summary::default(),
            results: Vec::new(),
        }
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let mut lru = Lru::new(2);
        lru.put("a", 1);
        lru.put("b", 2);
        assert_eq!(lru.get(&"a"), Some(&1));

        lru.put("c", 3);
        assert_eq!(lru.get(&"b"), None);
        assert_eq!(lru.get(&"a"), Some(&1));
        assert_eq!(lru.get(&"c"), Some(&3));
        assert_eq!(lru.len(), 2);

        lru.put("c", 4);
        assert_eq!(lru.get(&"c"), Some(&4));
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn lru_reuses_freed_slots() {
        let mut lru = Lru::new(1);
        for i in 0..10 {
            lru.put(i, i * 10);
        }
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.entries.len(), 1);
        assert_eq!(lru.get(&9), Some(&90));
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = ResultCache::new(4);
        let filter = Filter::unrestricted().with_borough(Borough::Bronx);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            results(&filter)
        };

        let first = cache.get_or_compute(&filter, compute);
        let second = cache.get_or_compute(&filter, compute);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = ResultCache::new(0);
        let filter = Filter::unrestricted();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            results(&filter)
        };

        let first = cache.get_or_compute(&filter, compute);
        let second = cache.get_or_compute(&filter, compute);

        assert!(!cache.is_enabled());
        assert!(cache.is_empty());
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_requests_share_one_computation() {
        let cache = ResultCache::new(4);
        let filter = Filter::unrestricted().with_borough(Borough::Queens);
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(4);

        let shared: Vec<Arc<DashboardResults>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache.get_or_compute(&filter, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            results(&filter)
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(shared.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }
}
