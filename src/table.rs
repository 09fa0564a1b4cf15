//! Hash-cons table with weak handles.
//!
//! A table maps a structural key to the canonical instance built for it. The
//! table holds only weak handles, so a node with no remaining strong
//! reference is reclaimed as soon as its last owner drops it. The table
//! notices this lazily: the dead slot is either revived by the next request
//! for the same key, or removed by compaction.
//!
//! # Layout
//!
//! Entries live in a plain `Vec`, chained from a power-of-two array of
//! bucket heads:
//!
//! ```text
//! buckets[h & mask] → entry → entry → ... → end
//! ```
//!
//! Chain links are stored as `index + 1`, with `0` marking the end of a chain.
//!
//! # Compaction
//!
//! Every time the number of occupied slots crosses a power of two, the table
//! counts its dead entries. If at least half of the slots are dead, the
//! table is rebuilt into a smaller backing store holding only the live
//! entries. The scan is amortized O(1) per insertion.

use std::hash::{BuildHasher, Hash};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::debug;
use rustc_hash::FxBuildHasher;

const MIN_BUCKETS: usize = 16;

struct Entry<K, V> {
    key: K,
    handle: Weak<V>,
    next: usize,
}

struct Inner<K, V> {
    data: Vec<Entry<K, V>>,
    buckets: Vec<usize>,
    bitmask: u64,
    hasher: FxBuildHasher,
    /// Occupied-slot count that triggers the next dead-entry scan.
    next_scan: usize,
    hits: usize,
    misses: usize,
    revived: usize,
    compactions: usize,
}

/// Snapshot of a table's counters.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct TableStats {
    /// Occupied slots, dead ones included.
    pub slots: usize,
    /// Slots whose node is still alive.
    pub live: usize,
    pub hits: usize,
    pub misses: usize,
    /// Dead slots reused for a new instance with the same key.
    pub revived: usize,
    pub compactions: usize,
}

/// A thread-safe get-or-create table, serialized by a single lock.
pub struct HashConsTable<K, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> Default for HashConsTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> HashConsTable<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                data: Vec::new(),
                buckets: vec![0; MIN_BUCKETS],
                bitmask: (MIN_BUCKETS - 1) as u64,
                hasher: FxBuildHasher,
                next_scan: 1,
                hits: 0,
                misses: 0,
                revived: 0,
                compactions: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // The critical sections never leave the table half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of occupied slots, dead ones included.
    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().data.is_empty()
    }

    /// Number of slots whose instance is still alive.
    pub fn live(&self) -> usize {
        self.lock().live()
    }

    pub fn stats(&self) -> TableStats {
        let inner = self.lock();
        TableStats {
            slots: inner.data.len(),
            live: inner.live(),
            hits: inner.hits,
            misses: inner.misses,
            revived: inner.revived,
            compactions: inner.compactions,
        }
    }
}

impl<K, V> HashConsTable<K, V>
where
    K: Hash + Eq,
{
    /// Return the live instance for `key`, or install the one built by `create`.
    ///
    /// `create` runs under the table lock and must not touch this table.
    pub fn get_or_create<F>(&self, key: K, create: F) -> Arc<V>
    where
        F: FnOnce() -> Arc<V>,
    {
        self.lock().get_or_create(key, create)
    }

    /// Return the live instance for `key`, if any.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let inner = self.lock();
        inner.find(key).and_then(|index| inner.data[index].handle.upgrade())
    }
}

impl<K, V> Inner<K, V> {
    fn live(&self) -> usize {
        self.data.iter().filter(|e| e.handle.strong_count() > 0).count()
    }
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq,
{
    fn bucket_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) & self.bitmask) as usize
    }

    fn find(&self, key: &K) -> Option<usize> {
        let mut link = self.buckets[self.bucket_index(key)];
        while link != 0 {
            let entry = &self.data[link - 1];
            if &entry.key == key {
                return Some(link - 1);
            }
            link = entry.next;
        }
        None
    }

    fn get_or_create<F>(&mut self, key: K, create: F) -> Arc<V>
    where
        F: FnOnce() -> Arc<V>,
    {
        if let Some(index) = self.find(&key) {
            if let Some(value) = self.data[index].handle.upgrade() {
                self.hits += 1;
                return value;
            }
            // Dead slot: install the new instance in place.
            let value = create();
            self.data[index].handle = Arc::downgrade(&value);
            self.misses += 1;
            self.revived += 1;
            return value;
        }

        let value = create();
        self.misses += 1;
        self.insert(key, Arc::downgrade(&value));
        value
    }

    fn insert(&mut self, key: K, handle: Weak<V>) {
        if self.data.len() >= self.buckets.len() {
            self.relink(self.buckets.len() * 2);
        }

        let bucket = self.bucket_index(&key);
        self.data.push(Entry {
            key,
            handle,
            next: self.buckets[bucket],
        });
        self.buckets[bucket] = self.data.len();

        if self.data.len() >= self.next_scan {
            self.maybe_compact();
        }
    }

    fn maybe_compact(&mut self) {
        let slots = self.data.len();
        let dead = slots - self.live();
        if dead * 2 >= slots && dead > 0 {
            debug!("compacting hash-cons table: {} of {} slots are dead", dead, slots);
            self.data.retain(|e| e.handle.strong_count() > 0);
            self.data.shrink_to_fit();
            let buckets = self.data.len().next_power_of_two().max(MIN_BUCKETS);
            self.relink(buckets);
            self.compactions += 1;
        }
        self.next_scan = (self.data.len() + 1).next_power_of_two();
    }

    /// Rebuild all chains over `buckets` bucket heads.
    fn relink(&mut self, buckets: usize) {
        assert!(buckets.is_power_of_two());
        self.buckets = vec![0; buckets];
        self.bitmask = (buckets - 1) as u64;
        for index in 0..self.data.len() {
            let bucket = self.bucket_index(&self.data[index].key);
            self.data[index].next = self.buckets[bucket];
            self.buckets[bucket] = index + 1;
        }
    }
}
