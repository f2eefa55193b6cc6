//! Query Store Module
//!
//! Synchronous cache state: entries, LRU order, statistics and the fetch
//! generation counter. All timing decisions take `now` explicitly; the async
//! `QueryClient` supplies wall-clock time.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::entry::{FetchOutcome, InFlight, QueryEntry, QueryStatus, SharedFetch};
use super::key::QueryKey;
use super::lru::LruTracker;
use super::stats::QueryStats;
use crate::client::Envelope;
use crate::error::ActionError;

// == Query State ==
/// What a reader sees for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub data: Option<Envelope>,
    pub error: Option<ActionError>,
    pub status: QueryStatus,
    pub updated_at: Option<u64>,
}

impl QueryState {
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            updated_at: None,
        }
    }

    /// Built from a fetch result when the entry is gone by the time it lands.
    pub fn from_outcome(outcome: FetchOutcome, now: u64) -> Self {
        match outcome {
            Ok(envelope) => Self {
                data: Some(envelope),
                error: None,
                status: QueryStatus::Fresh,
                updated_at: Some(now),
            },
            Err(err) => Self {
                data: None,
                error: Some(err),
                status: QueryStatus::StaleError,
                updated_at: None,
            },
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Fetching
    }

    /// Fetching with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.is_fetching() && self.data.is_none()
    }
}

// == Read Plan ==
/// Decision taken under the store lock for one read.
pub enum ReadPlan {
    /// Answer immediately
    Serve(QueryState),
    /// Await the fetch already in flight
    Join(SharedFetch),
    /// A fetch must be started with `generation`; `serve` is set when stale
    /// data may be returned right away while it runs.
    Start {
        generation: u64,
        serve: Option<QueryState>,
    },
}

impl fmt::Debug for ReadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadPlan::Serve(state) => f.debug_tuple("Serve").field(state).finish(),
            ReadPlan::Join(_) => f.write_str("Join"),
            ReadPlan::Start { generation, serve } => f
                .debug_struct("Start")
                .field("generation", generation)
                .field("serve", serve)
                .finish(),
        }
    }
}

// == Query Store ==
#[derive(Debug)]
pub struct QueryStore {
    entries: HashMap<QueryKey, QueryEntry>,
    lru: LruTracker<QueryKey>,
    stats: QueryStats,
    max_entries: usize,
    stale_time_ms: u64,
    gc_time_ms: u64,
    next_generation: u64,
}

impl QueryStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` keys.
    pub fn new(max_entries: usize, stale_time_ms: u64, gc_time_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: QueryStats::new(),
            max_entries: max_entries.max(1),
            stale_time_ms,
            gc_time_ms,
            next_generation: 0,
        }
    }

    // == Plan Read ==
    /// Observes `key` and decides how the read is answered.
    pub fn plan_read(&mut self, key: &QueryKey, now: u64) -> ReadPlan {
        self.lru.touch(key);

        if !self.entries.contains_key(key) {
            self.insert_entry(key.clone(), now);
            self.stats.record_miss();
            let generation = self.begin_fetch(key);
            return ReadPlan::Start {
                generation,
                serve: None,
            };
        }

        let stale_time_ms = self.stale_time_ms;
        let Some(entry) = self.entries.get_mut(key) else {
            return ReadPlan::Serve(QueryState::idle());
        };
        entry.last_observed = now;

        if let Some(in_flight) = &entry.in_flight {
            if entry.is_servable() {
                let state = snapshot(entry, now, stale_time_ms);
                self.stats.record_stale_hit();
                return ReadPlan::Serve(state);
            }
            let future = in_flight.future.clone();
            self.stats.record_join();
            return ReadPlan::Join(future);
        }

        if entry.is_fresh(now, stale_time_ms) {
            let state = snapshot(entry, now, stale_time_ms);
            self.stats.record_hit();
            return ReadPlan::Serve(state);
        }

        // Time-stale data is served while it revalidates; invalidated or
        // failed entries make the reader wait for the refetch.
        let serve = if entry.is_servable() {
            let mut state = snapshot(entry, now, stale_time_ms);
            state.status = QueryStatus::Fetching;
            self.stats.record_stale_hit();
            Some(state)
        } else {
            self.stats.record_miss();
            None
        };
        let generation = self.begin_fetch(key);
        ReadPlan::Start { generation, serve }
    }

    // == Plan Refetch ==
    /// Explicit refetch: joins the in-flight fetch or starts a new one.
    pub fn plan_refetch(&mut self, key: &QueryKey, now: u64) -> ReadPlan {
        self.lru.touch(key);
        if !self.entries.contains_key(key) {
            self.insert_entry(key.clone(), now);
        }

        let in_flight = self.entries.get_mut(key).and_then(|entry| {
            entry.last_observed = now;
            entry.in_flight.as_ref().map(|f| f.future.clone())
        });

        match in_flight {
            Some(future) => {
                self.stats.record_join();
                ReadPlan::Join(future)
            }
            None => {
                self.stats.record_miss();
                let generation = self.begin_fetch(key);
                ReadPlan::Start {
                    generation,
                    serve: None,
                }
            }
        }
    }

    fn insert_entry(&mut self, key: QueryKey, now: u64) {
        // The new key was touched first, so it is never the oldest unless alone.
        while self.entries.len() >= self.max_entries {
            let Some(oldest) = self.lru.evict_oldest() else {
                break;
            };
            if oldest == key {
                self.lru.touch(&key);
                break;
            }
            if self.entries.remove(&oldest).is_some() {
                debug!("Evicted least recently used query {}", oldest);
                self.stats.record_evictions(1);
            }
        }
        self.entries.insert(key, QueryEntry::new(now));
        self.stats.set_total_entries(self.entries.len());
    }

    fn begin_fetch(&mut self, key: &QueryKey) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.started_generation = generation;
        }
        self.stats.record_fetch();
        generation
    }

    // == Attach ==
    /// Registers the shared future of a started fetch for single-flight joins.
    pub fn attach(&mut self, key: &QueryKey, generation: u64, future: SharedFetch) {
        if let Some(entry) = self.entries.get_mut(key) {
            if entry.started_generation == generation {
                entry.in_flight = Some(InFlight { generation, future });
            }
        }
    }

    // == Complete ==
    /// Stores the outcome of fetch `generation`.
    ///
    /// Returns false when the result was discarded: the entry is gone, or a
    /// fetch that started later already stored its result.
    pub fn complete(
        &mut self,
        key: &QueryKey,
        generation: u64,
        outcome: FetchOutcome,
        now: u64,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            self.stats.record_dropped();
            return false;
        };

        if entry
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            entry.in_flight = None;
        }

        if generation <= entry.applied_generation {
            self.stats.record_dropped();
            debug!("Dropped late result for {} (generation {})", key, generation);
            return false;
        }
        entry.applied_generation = generation;

        match outcome {
            Ok(envelope) => {
                entry.data = Some(envelope);
                entry.error = None;
                entry.updated_at = Some(now);
                entry.failure_count = 0;
                entry.invalidated = generation <= entry.stale_before;
            }
            Err(err) => {
                entry.error = Some(err);
                entry.failure_count += 1;
            }
        }
        true
    }

    // == Invalidate ==
    /// Marks every entry matching `predicate` stale and detaches its in-flight
    /// fetch, so the next read starts a new request. Returns the match count.
    pub fn invalidate(&mut self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let mut count = 0;
        for (key, entry) in self.entries.iter_mut() {
            if predicate(key) {
                entry.invalidated = true;
                entry.stale_before = entry.started_generation;
                entry.in_flight = None;
                count += 1;
            }
        }
        count
    }

    // == Remove ==
    /// Drops every entry matching `predicate`. Returns the removed count.
    pub fn remove_where(&mut self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        self.lru.retain(|key| !predicate(key));
        self.stats.set_total_entries(self.entries.len());
        before - self.entries.len()
    }

    // == Collect Garbage ==
    /// Evicts entries nobody observed within the GC window.
    pub fn collect_garbage(&mut self, now: u64) -> usize {
        let gc_time_ms = self.gc_time_ms;
        let idle: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_idle(now, gc_time_ms))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &idle {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.record_evictions(idle.len());
        self.stats.set_total_entries(self.entries.len());
        idle.len()
    }

    // == Peek ==
    /// Current state of `key` without counting as an observation.
    pub fn peek(&self, key: &QueryKey, now: u64) -> QueryState {
        self.entries
            .get(key)
            .map(|entry| snapshot(entry, now, self.stale_time_ms))
            .unwrap_or_else(QueryState::idle)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn stats(&self) -> QueryStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn snapshot(entry: &QueryEntry, now: u64, stale_time_ms: u64) -> QueryState {
    QueryState {
        data: entry.data.clone(),
        error: entry.error.clone(),
        status: entry.status(now, stale_time_ms),
        updated_at: entry.updated_at,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    const STALE: u64 = 1_000;
    const GC: u64 = 5_000;

    fn key(params: serde_json::Value) -> QueryKey {
        QueryKey::new("session", "list_products", &params)
    }

    fn envelope(tag: &str) -> FetchOutcome {
        Ok(Envelope::new(json!([tag])))
    }

    fn pending() -> SharedFetch {
        futures::future::pending::<FetchOutcome>().boxed().shared()
    }

    fn start(store: &mut QueryStore, key: &QueryKey, now: u64) -> u64 {
        match store.plan_read(key, now) {
            ReadPlan::Start { generation, .. } => {
                store.attach(key, generation, pending());
                generation
            }
            other => panic!("expected a fetch to start, got {:?}", other),
        }
    }

    #[test]
    fn test_first_read_starts_fetch() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));

        let generation = start(&mut store, &k, 0);
        assert_eq!(generation, 1);
        assert_eq!(store.peek(&k, 0).status, QueryStatus::Fetching);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_concurrent_read_joins_in_flight() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));
        start(&mut store, &k, 0);

        assert!(matches!(store.plan_read(&k, 1), ReadPlan::Join(_)));
        assert_eq!(store.stats().fetches, 1);
        assert_eq!(store.stats().deduplicated, 1);
    }

    #[test]
    fn test_fresh_then_stale_while_revalidate() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));
        let g = start(&mut store, &k, 0);
        assert!(store.complete(&k, g, envelope("a"), 10));

        match store.plan_read(&k, 500) {
            ReadPlan::Serve(state) => assert_eq!(state.status, QueryStatus::Fresh),
            other => panic!("expected fresh hit, got {:?}", other),
        }

        match store.plan_read(&k, 10 + STALE) {
            ReadPlan::Start { serve: Some(state), .. } => {
                assert!(state.is_fetching());
                assert_eq!(state.data.unwrap().data, json!(["a"]));
            }
            other => panic!("expected stale-while-revalidate, got {:?}", other),
        }
    }

    #[test]
    fn test_invalidated_entry_waits_for_refetch() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));
        let g = start(&mut store, &k, 0);
        store.complete(&k, g, envelope("a"), 10);

        assert_eq!(store.invalidate(|_| true), 1);
        assert!(matches!(
            store.plan_read(&k, 20),
            ReadPlan::Start { serve: None, .. }
        ));
    }

    #[test]
    fn test_invalidate_twice_equals_once() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));
        let g = start(&mut store, &k, 0);
        store.complete(&k, g, envelope("a"), 10);

        store.invalidate(|_| true);
        store.invalidate(|_| true);

        start(&mut store, &k, 20);
        assert!(matches!(store.plan_read(&k, 21), ReadPlan::Join(_)));
        assert_eq!(store.stats().fetches, 2);
    }

    #[test]
    fn test_late_result_from_earlier_fetch_is_dropped() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));

        let a = start(&mut store, &k, 0);
        store.invalidate(|_| true);
        let b = start(&mut store, &k, 5);

        assert!(store.complete(&k, b, envelope("b"), 10));
        assert!(!store.complete(&k, a, envelope("a"), 20));

        let state = store.peek(&k, 21);
        assert_eq!(state.data.unwrap().data, json!(["b"]));
        assert_eq!(state.status, QueryStatus::Fresh);
        assert_eq!(store.stats().dropped_results, 1);
    }

    #[test]
    fn test_result_started_before_invalidation_stays_stale() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));

        let a = start(&mut store, &k, 0);
        store.invalidate(|_| true);
        assert!(store.complete(&k, a, envelope("a"), 10));

        assert_eq!(store.peek(&k, 11).status, QueryStatus::Stale);
    }

    #[test]
    fn test_failure_keeps_previous_data() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));
        let g = start(&mut store, &k, 0);
        store.complete(&k, g, envelope("a"), 10);

        let g = match store.plan_read(&k, 10 + STALE) {
            ReadPlan::Start { generation, .. } => generation,
            other => panic!("unexpected {:?}", other),
        };
        store.complete(&k, g, Err(ActionError::Transport("down".into())), 2_000);

        let state = store.peek(&k, 2_001);
        assert_eq!(state.status, QueryStatus::StaleError);
        assert_eq!(state.data.unwrap().data, json!(["a"]));
    }

    #[test]
    fn test_refetch_joins_in_flight() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));
        start(&mut store, &k, 0);
        assert!(matches!(store.plan_refetch(&k, 1), ReadPlan::Join(_)));
    }

    #[test]
    fn test_garbage_collection_spares_observed_and_in_flight() {
        let mut store = QueryStore::new(10, STALE, GC);
        let idle = key(json!({"page": 1}));
        let busy = key(json!({"page": 2}));
        let recent = key(json!({"page": 3}));

        let g = start(&mut store, &idle, 0);
        store.complete(&idle, g, envelope("a"), 0);
        start(&mut store, &busy, 0);
        let g = start(&mut store, &recent, 0);
        store.complete(&recent, g, envelope("c"), 0);
        store.plan_read(&recent, GC);

        assert_eq!(store.collect_garbage(GC), 1);
        assert!(!store.contains(&idle));
        assert!(store.contains(&busy));
        assert!(store.contains(&recent));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_evicted_key_reads_as_idle() {
        let mut store = QueryStore::new(10, STALE, GC);
        let k = key(json!({}));
        let g = start(&mut store, &k, 0);
        store.complete(&k, g, envelope("a"), 0);
        store.collect_garbage(GC);

        assert_eq!(store.peek(&k, GC), QueryState::idle());
        assert!(matches!(
            store.plan_read(&k, GC),
            ReadPlan::Start { serve: None, .. }
        ));
    }

    #[test]
    fn test_capacity_evicts_least_recently_observed() {
        let mut store = QueryStore::new(2, STALE, GC);
        let a = key(json!({"page": 1}));
        let b = key(json!({"page": 2}));
        let c = key(json!({"page": 3}));

        start(&mut store, &a, 0);
        start(&mut store, &b, 1);
        store.plan_read(&a, 2);
        start(&mut store, &c, 3);

        assert_eq!(store.len(), 2);
        assert!(store.contains(&a));
        assert!(!store.contains(&b));
        assert!(store.contains(&c));
    }

    #[test]
    fn test_remove_scope() {
        let mut store = QueryStore::new(10, STALE, GC);
        let mine = QueryKey::new("s1", "list_orders", &json!({}));
        let theirs = QueryKey::new("s2", "list_orders", &json!({}));
        start(&mut store, &mine, 0);
        start(&mut store, &theirs, 0);

        assert_eq!(store.remove_where(|k| k.scope == "s1"), 1);
        assert!(!store.contains(&mine));
        assert!(store.contains(&theirs));
    }
}
