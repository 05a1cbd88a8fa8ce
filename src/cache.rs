// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bounded entity caches.
//!
//! Stream sections can interpose a cache between the list and the reader
//! pool. The built-in implementation is a capacity-bounded LRU: a hash map
//! from key to slot plus an intrusive doubly-linked recency list over a
//! slab of entries, all serialized by a single mutex.
//!
//! [LruCache::get_or_load] runs its loader *outside* the lock. Two threads
//! missing on the same key may therefore both run the loader; the last
//! insert wins. That redundancy is tolerated by design - values are pure
//! functions of the file and the key - and it keeps lock hold times O(1).
//!
//! Callers can instead supply their own cache through the [ExternalCache]
//! trait, which the lists drive with an explicit lookup / load / store
//! sequence.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::{
    hash::Hash,
    sync::atomic::{AtomicU64, Ordering},
};

const NIL: usize = usize::MAX;

struct Entry<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

struct LruState<K, V> {
    map: FxHashMap<K, usize>,
    entries: Vec<Entry<K, V>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl<K: Copy + Eq + Hash, V: Clone> LruState<K, V> {
    fn detach(&mut self, slot: usize) {
        let (prev, next) = {
            let entry = &self.entries[slot];
            (entry.prev, entry.next)
        };

        if prev == NIL {
            self.head = next;
        } else {
            self.entries[prev].next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.entries[next].prev = prev;
        }
    }

    fn push_front(&mut self, slot: usize) {
        self.entries[slot].prev = NIL;
        self.entries[slot].next = self.head;

        if self.head != NIL {
            self.entries[self.head].prev = slot;
        }

        self.head = slot;

        if self.tail == NIL {
            self.tail = slot;
        }
    }

    fn touch(&mut self, slot: usize) {
        if self.head != slot {
            self.detach(slot);
            self.push_front(slot);
        }
    }
}

/// A capacity-bounded cache with least-recently-used eviction.
pub struct LruCache<K, V> {
    state: Mutex<LruState<K, V>>,
    capacity: usize,
    requests: AtomicU64,
    misses: AtomicU64,
}

impl<K: Copy + Eq + Hash, V: Clone> LruCache<K, V> {
    /// Create a cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config(
                "cache capacity must be at least one entry".to_string(),
            ));
        }

        Ok(Self {
            state: Mutex::new(LruState {
                map: FxHashMap::default(),
                entries: Vec::new(),
                free: Vec::new(),
                head: NIL,
                tail: NIL,
            }),
            capacity,
            requests: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total lookups served.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Lookups that ran the loader.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Look up a key, marking it most recently used on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();

        let slot = *state.map.get(key)?;
        state.touch(slot);

        Some(state.entries[slot].value.clone())
    }

    /// Insert a value, evicting the least recently used entry when full.
    pub fn put(&self, key: K, value: V) {
        let mut state = self.state.lock();

        if let Some(&slot) = state.map.get(&key) {
            state.entries[slot].value = value;
            state.touch(slot);
            return;
        }

        if state.map.len() >= self.capacity {
            let victim = state.tail;
            state.detach(victim);
            let old_key = state.entries[victim].key;
            state.map.remove(&old_key);
            state.free.push(victim);
        }

        let slot = if let Some(slot) = state.free.pop() {
            state.entries[slot] = Entry {
                key,
                value,
                prev: NIL,
                next: NIL,
            };
            slot
        } else {
            state.entries.push(Entry {
                key,
                value,
                prev: NIL,
                next: NIL,
            });
            state.entries.len() - 1
        };

        state.map.insert(key, slot);
        state.push_front(slot);
    }

    /// Look up a key, running `loader` on a miss and caching its result.
    ///
    /// The loader runs without the cache lock held, so concurrent misses
    /// on one key may each load; the last insert wins. A loader error is
    /// returned unchanged and nothing is stored.
    pub fn get_or_load(&self, key: K, loader: impl FnOnce() -> Result<V>) -> Result<V> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);

        let value = loader()?;
        self.put(key, value.clone());

        Ok(value)
    }
}

/// A caller-supplied cache driven with an explicit check / load / store
/// sequence.
///
/// Intended for caches the crate cannot own, such as a process-wide or
/// write-through distributed cache. A loader failure between `lookup` and
/// `store` surfaces to the caller unchanged and nothing is stored.
pub trait ExternalCache<V>: Send + Sync {
    fn lookup(&self, key: u32) -> Option<V>;

    fn store(&self, key: u32, value: V);
}
