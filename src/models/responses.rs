//! Response DTOs for the gateway API
//!
//! Defines the structure of outgoing HTTP response bodies that are not
//! action envelopes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::query::QueryStats;
use crate::session::{Session, UserProfile};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub queries: QueryStats,
    /// Share of reads answered without waiting for the backend
    pub hit_rate: f64,
    /// Live sessions
    pub sessions: usize,
}

impl StatsResponse {
    pub fn new(queries: QueryStats, sessions: usize) -> Self {
        Self {
            hit_rate: queries.hit_rate(),
            queries,
            sessions,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Signed-in user, returned by login and `GET /auth/session`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            expires_at: session.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_flattens_counters() {
        let mut stats = QueryStats::new();
        stats.record_hit();
        stats.record_miss();
        let resp = StatsResponse::new(stats, 2);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["sessions"], 2);
        assert!((resp.hit_rate - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_session_response_hides_token() {
        let session = Session::new("secret", UserProfile::default(), chrono::Duration::days(7));
        let json = serde_json::to_string(&SessionResponse::from(&session)).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("expires_at"));
    }
}
