//! Bounded retry with exponential backoff for query fetches.

use std::time::Duration;

use tracing::warn;

use super::entry::FetchOutcome;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// `base_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Calls `fetch` until it succeeds, fails with a non-retryable error or
    /// the retry budget is spent.
    pub async fn run<F, Fut>(&self, fetch: F) -> FetchOutcome
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FetchOutcome>,
    {
        let mut attempt = 0;
        loop {
            match fetch().await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Query fetch failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
