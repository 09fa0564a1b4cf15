//! Memoization cache for interpretation results.
//!
//! A thin wrapper around an `FxHashMap` that counts hits and misses. The
//! cache has no collisions and grows on demand; `bits` only sizes the initial
//! allocation.

use std::hash::Hash;

use rustc_hash::FxHashMap;

pub struct HashMapCache<K, V> {
    map: FxHashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for HashMapCache<K, V> {
    fn default() -> Self {
        Self::new(10)
    }
}

impl<K, V> HashMapCache<K, V> {
    /// Creates a cache with room for `2^bits` entries.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is above 31.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");
        Self {
            map: FxHashMap::with_capacity_and_hasher(1 << bits, Default::default()),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Get the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<K, V> HashMapCache<K, V>
where
    K: Hash + Eq,
{
    /// Get the cached result.
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.map.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a result into the cache.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_cache_basic() {
        let mut cache = HashMapCache::<(u64, u32), String>::new(4);

        cache.insert((1, 0), "one".to_string());
        cache.insert((2, 7), "two".to_string());

        assert_eq!(cache.get(&(1, 0)).map(String::as_str), Some("one"));
        assert_eq!(cache.get(&(2, 7)).map(String::as_str), Some("two"));
        assert_eq!(cache.get(&(2, 0)), None);

        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_cache_grows_past_initial_size() {
        let mut cache = HashMapCache::<u64, u64>::new(2);
        assert!(cache.is_empty());
        for i in 0..100 {
            cache.insert(i, i * i);
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.get(&9), Some(&81));
    }

    #[test]
    #[should_panic(expected = "Bits should be in the range 0..=31")]
    fn test_cache_bits_out_of_range() {
        let _ = HashMapCache::<u64, u64>::new(32);
    }
}
