use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Parsed tables kept around per distinct upload.
pub const TABLE_CACHE_CAPACITY: usize = 16;

/// Rendered chart PNGs kept across interactions.
pub const CHART_CACHE_CAPACITY: usize = 64;

/// Hash an arbitrary tuple of cache-key parts into a 64-bit key.
pub fn cache_key<T: Hash>(parts: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    parts.hash(&mut hasher);
    hasher.finish()
}

/// A bounded content-addressed cache.
///
/// Keys are hashes of the serialized inputs, so identical inputs always hit
/// regardless of object identity. Capacity is fixed; when full, the oldest
/// inserted entry is evicted first. Values are handed out as `Arc`s so a hit
/// costs a refcount bump, not a clone of the payload.
pub struct ContentCache<V> {
    capacity: usize,
    map: HashMap<u64, Arc<V>>,
    order: VecDeque<u64>,
}

impl<V> ContentCache<V> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        ContentCache {
            capacity,
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: u64) -> Option<Arc<V>> {
        self.map.get(&key).cloned()
    }

    /// Insert a value, evicting the oldest entry if the cache is full. If the
    /// key is already present its value is replaced in place.
    pub fn insert(&mut self, key: u64, value: V) -> Arc<V> {
        let value = Arc::new(value);
        if self.map.insert(key, Arc::clone(&value)).is_none() {
            self.order.push_back(key);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
        }
        value
    }

    /// Look up a key, computing and caching the value on a miss. The closure
    /// may fail, in which case nothing is cached.
    pub fn get_or_try_insert<E>(
        &mut self,
        key: u64,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        Ok(self.insert(key, compute()?))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
