//! Query Client Module
//!
//! Async front of the query store. Binds a cache key to a fetch function,
//! deduplicates concurrent fetches per key and retries transport failures.
//!
//! Fetches are spawned onto the runtime: a caller that goes away does not
//! cancel the request, its result still lands in the cache (unless a later
//! fetch for the same key already did).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::RwLock;
use tracing::debug;

use super::entry::{current_timestamp_ms, FetchOutcome, QueryStatus, SharedFetch};
use super::key::{scope_fingerprint, QueryKey};
use super::retry::RetryPolicy;
use super::stats::QueryStats;
use super::store::{QueryState, QueryStore, ReadPlan};
use crate::config::Config;

/// Type-erased fetch function, called once per attempt.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchOutcome> + Send + Sync>;

// == Query Config ==
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub stale_time: Duration,
    pub gc_time: Duration,
    pub max_entries: usize,
    pub retry: RetryPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(60),
            gc_time: Duration::from_secs(300),
            max_entries: 1000,
            retry: RetryPolicy::default(),
        }
    }
}

impl QueryConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_time: config.stale_time(),
            gc_time: config.gc_time(),
            max_entries: config.max_queries,
            retry: RetryPolicy::new(
                config.retry_count,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
        }
    }
}

// == Query Client ==
/// Injectable, cloneable handle to one query cache.
#[derive(Clone)]
pub struct QueryClient {
    store: Arc<RwLock<QueryStore>>,
    retry: RetryPolicy,
}

impl QueryClient {
    pub fn new(config: QueryConfig) -> Self {
        let store = QueryStore::new(
            config.max_entries,
            config.stale_time.as_millis() as u64,
            config.gc_time.as_millis() as u64,
        );
        Self {
            store: Arc::new(RwLock::new(store)),
            retry: config.retry,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(QueryConfig::from_config(config))
    }

    // == Query ==
    /// Reads `key`, fetching with `fetch` when the cache cannot answer.
    ///
    /// Fresh data is returned immediately; time-stale data is returned
    /// immediately while a background refetch runs; otherwise the call waits
    /// for the (possibly shared) fetch.
    pub async fn query<F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        self.resolve(key, erase(fetch), QueryStore::plan_read).await
    }

    // == Refetch ==
    /// Forces a fetch for `key` unless one is already in flight.
    pub async fn refetch<F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        self.resolve(key, erase(fetch), QueryStore::plan_refetch).await
    }

    async fn resolve(
        &self,
        key: QueryKey,
        fetch: Fetcher,
        plan: fn(&mut QueryStore, &QueryKey, u64) -> ReadPlan,
    ) -> QueryState {
        let future = {
            let mut store = self.store.write().await;
            match plan(&mut *store, &key, current_timestamp_ms()) {
                ReadPlan::Serve(state) => return state,
                ReadPlan::Join(future) => {
                    debug!("Joining in-flight fetch for {}", key);
                    future
                }
                ReadPlan::Start { generation, serve } => {
                    let future = self.spawn_fetch(key.clone(), generation, fetch);
                    store.attach(&key, generation, future.clone());
                    if let Some(state) = serve {
                        return state;
                    }
                    future
                }
            }
        };

        let outcome = future.await;
        let now = current_timestamp_ms();
        let state = self.store.read().await.peek(&key, now);
        if state.status == QueryStatus::Idle {
            // Evicted or cleared while the fetch ran.
            QueryState::from_outcome(outcome, now)
        } else {
            state
        }
    }

    fn spawn_fetch(&self, key: QueryKey, generation: u64, fetch: Fetcher) -> SharedFetch {
        let store = Arc::clone(&self.store);
        let retry = self.retry.clone();

        debug!("Starting fetch {} for {}", generation, key);
        let future = async move {
            let outcome = retry.run(|| fetch()).await;
            let applied = store.write().await.complete(
                &key,
                generation,
                outcome.clone(),
                current_timestamp_ms(),
            );
            if !applied {
                debug!("Discarded result of fetch {} for {}", generation, key);
            }
            outcome
        }
        .boxed()
        .shared();

        tokio::spawn(future.clone());
        future
    }

    // == Invalidate ==
    /// Marks every cached read of `operations` in `scope` stale.
    pub async fn invalidate(&self, scope: &str, operations: &[&str]) -> usize {
        let count = self
            .store
            .write()
            .await
            .invalidate(|key| key.matches_operation(scope, operations));
        debug!(scope = %scope_fingerprint(scope), ?operations, count, "Invalidated queries");
        count
    }

    /// Marks a single key stale.
    pub async fn invalidate_key(&self, key: &QueryKey) -> usize {
        self.store.write().await.invalidate(|k| k == key)
    }

    // == Clear Scope ==
    /// Drops every entry of `scope`, e.g. on logout.
    pub async fn clear_scope(&self, scope: &str) -> usize {
        self.store
            .write()
            .await
            .remove_where(|key| key.scope == scope)
    }

    /// Drops every entry.
    pub async fn reset(&self) -> usize {
        self.store.write().await.remove_where(|_| true)
    }

    pub async fn collect_garbage(&self) -> usize {
        self.store
            .write()
            .await
            .collect_garbage(current_timestamp_ms())
    }

    /// Current state of `key` without counting as a read.
    pub async fn peek(&self, key: &QueryKey) -> QueryState {
        self.store.read().await.peek(key, current_timestamp_ms())
    }

    pub async fn stats(&self) -> QueryStats {
        self.store.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

fn erase<F, Fut>(fetch: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchOutcome> + Send + 'static,
{
    Arc::new(move || fetch().boxed())
}
