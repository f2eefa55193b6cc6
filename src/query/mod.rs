//! Query Module
//!
//! Client-side query cache: per-key single-flight fetching, staleness,
//! invalidation after mutations, bounded retries and idle eviction.

mod client;
mod entry;
mod key;
mod lru;
mod retry;
mod stats;
mod store;


// Re-export public types
pub use client::{Fetcher, QueryClient, QueryConfig};
pub use entry::{current_timestamp_ms, FetchOutcome, QueryEntry, QueryStatus, SharedFetch};
pub use key::{scope_fingerprint, QueryKey};
pub use lru::LruTracker;
pub use retry::RetryPolicy;
pub use stats::QueryStats;
pub use store::{QueryState, QueryStore, ReadPlan};
