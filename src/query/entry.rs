//! Query Entry Module
//!
//! One cached read: last-known data, last error, clocks and the in-flight marker.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::{BoxFuture, Shared};
use serde::Serialize;

use crate::client::Envelope;
use crate::error::ActionError;

/// Result of one fetch, shared by every caller awaiting it.
pub type FetchOutcome = Result<Envelope, ActionError>;

/// Single-flight handle of an in-flight fetch.
pub type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

// == Query Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Never fetched (or evicted)
    Idle,
    Fetching,
    Fresh,
    /// Past its freshness window or explicitly invalidated
    Stale,
    /// Last fetch failed; previous data, if any, is kept
    StaleError,
}

// == In Flight ==
pub struct InFlight {
    pub generation: u64,
    pub future: SharedFetch,
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("generation", &self.generation)
            .finish()
    }
}

// == Query Entry ==
#[derive(Debug, Default)]
pub struct QueryEntry {
    /// Last successful payload
    pub data: Option<Envelope>,
    /// Error of the last applied fetch, cleared on success
    pub error: Option<ActionError>,
    /// When `data` was stored (Unix milliseconds)
    pub updated_at: Option<u64>,
    /// Last read of this key (Unix milliseconds)
    pub last_observed: u64,
    /// Marked stale by a mutation
    pub invalidated: bool,
    /// Generation of the newest fetch started for this key
    pub started_generation: u64,
    /// Generation whose result is currently stored
    pub applied_generation: u64,
    /// Results of fetches up to this generation arrive already stale
    pub stale_before: u64,
    pub in_flight: Option<InFlight>,
    pub failure_count: u32,
}

impl QueryEntry {
    pub fn new(now: u64) -> Self {
        Self {
            last_observed: now,
            ..Self::default()
        }
    }

    /// Data that may be handed out without waiting for a refetch.
    pub fn is_servable(&self) -> bool {
        self.data.is_some() && self.error.is_none() && !self.invalidated
    }

    // == Is Fresh ==
    /// Servable and still inside the freshness window.
    ///
    /// Boundary condition: an entry is stale once `now >= updated_at + stale_time`.
    pub fn is_fresh(&self, now: u64, stale_time_ms: u64) -> bool {
        self.is_servable()
            && self
                .updated_at
                .is_some_and(|at| now < at.saturating_add(stale_time_ms))
    }

    /// Not observed for at least `gc_time_ms` and nothing in flight.
    pub fn is_idle(&self, now: u64, gc_time_ms: u64) -> bool {
        self.in_flight.is_none() && now.saturating_sub(self.last_observed) >= gc_time_ms
    }

    pub fn status(&self, now: u64, stale_time_ms: u64) -> QueryStatus {
        if self.in_flight.is_some() {
            QueryStatus::Fetching
        } else if self.error.is_some() {
            QueryStatus::StaleError
        } else if self.data.is_none() {
            QueryStatus::Idle
        } else if self.is_fresh(now, stale_time_ms) {
            QueryStatus::Fresh
        } else {
            QueryStatus::Stale
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
