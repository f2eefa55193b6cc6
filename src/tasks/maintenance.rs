//! Maintenance Task
//!
//! Background task that periodically garbage-collects idle cached queries
//! and drops expired sessions.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::query::QueryClient;
use crate::session::SessionStore;

/// Spawns a background task that runs one maintenance pass every
/// `interval_secs` seconds.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_maintenance_task(queries.clone(), sessions.clone(), 30);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_maintenance_task(
    queries: QueryClient,
    sessions: SessionStore,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting maintenance task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let evicted = queries.collect_garbage().await;
            let expired = sessions.cleanup_expired().await;

            if evicted > 0 || expired > 0 {
                info!(
                    "Maintenance: evicted {} idle queries, dropped {} expired sessions",
                    evicted, expired
                );
            } else {
                debug!("Maintenance: nothing to clean up");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Envelope;
    use crate::query::{QueryConfig, QueryKey};
    use crate::session::{Session, UserProfile};
    use serde_json::json;

    fn queries(gc_time: Duration) -> QueryClient {
        QueryClient::new(QueryConfig {
            gc_time,
            ..QueryConfig::default()
        })
    }

    async fn cache_one(queries: &QueryClient) {
        let key = QueryKey::new("s", "list_roles", &json!({}));
        queries
            .query(key, || async { Ok(Envelope::new(json!([]))) })
            .await;
    }

    #[tokio::test]
    async fn test_maintenance_evicts_idle_queries() {
        let queries = queries(Duration::ZERO);
        cache_one(&queries).await;
        assert_eq!(queries.len().await, 1);

        let handle = spawn_maintenance_task(queries.clone(), SessionStore::new(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(queries.len().await, 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_maintenance_preserves_observed_queries() {
        let queries = queries(Duration::from_secs(300));
        cache_one(&queries).await;

        let handle = spawn_maintenance_task(queries.clone(), SessionStore::new(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(queries.len().await, 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_maintenance_drops_expired_sessions() {
        let sessions = SessionStore::new();
        sessions
            .insert(Session::new("old", UserProfile::default(), chrono::Duration::seconds(-1)))
            .await;
        sessions
            .insert(Session::new("live", UserProfile::default(), chrono::Duration::days(7)))
            .await;

        let handle = spawn_maintenance_task(queries(Duration::from_secs(300)), sessions.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(sessions.len().await, 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_maintenance_task_can_be_aborted() {
        let handle = spawn_maintenance_task(queries(Duration::ZERO), SessionStore::new(), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
