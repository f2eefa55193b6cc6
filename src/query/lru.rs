//! LRU Tracker Module
//!
//! Tracks observation order of cached queries for capacity eviction.

use std::collections::VecDeque;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently observed
/// - Back = Least recently observed
#[derive(Debug)]
pub struct LruTracker<K> {
    order: VecDeque<K>,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }
}

impl<K: Clone + PartialEq> LruTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as recently observed (moves to front).
    pub fn touch(&mut self, key: &K) {
        self.remove(key);
        self.order.push_front(key.clone());
    }

    pub fn remove(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    /// Removes every key matching `predicate`.
    pub fn retain(&mut self, predicate: impl Fn(&K) -> bool) {
        self.order.retain(|k| predicate(k));
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently observed key.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    #[allow(dead_code)]
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.back()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[allow(dead_code)]
    pub fn contains(&self, key: &K) -> bool {
        self.order.iter().any(|k| k == key)
    }
}
