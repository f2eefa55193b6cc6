//! Query Statistics Module
//!
//! Tracks cache behaviour: hits, misses, fetches, single-flight joins and evictions.

use serde::Serialize;

// == Query Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStats {
    /// Reads answered from a fresh entry
    pub hits: u64,
    /// Reads answered with stale data while a refetch runs
    pub stale_hits: u64,
    /// Reads that had to wait for a fetch they started
    pub misses: u64,
    /// Reads that joined a fetch already in flight
    pub deduplicated: u64,
    /// Fetches started
    pub fetches: u64,
    /// Results discarded because a later-started fetch already landed
    pub dropped_results: u64,
    /// Entries removed by GC or capacity pressure
    pub evictions: u64,
    /// Current number of cached queries
    pub total_entries: usize,
}

impl QueryStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Share of reads answered without waiting, 0.0 if nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses + self.deduplicated;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_stale_hit(&mut self) {
        self.stale_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_join(&mut self) {
        self.deduplicated += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped_results += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = QueryStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.fetches, 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_counts_stale_hits_as_served() {
        let mut stats = QueryStats::new();
        stats.record_hit();
        stats.record_stale_hit();
        stats.record_miss();
        stats.record_join();
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_evictions() {
        let mut stats = QueryStats::new();
        stats.record_evictions(3);
        stats.record_evictions(2);
        assert_eq!(stats.evictions, 5);
    }
}
