//! Request DTOs for the gateway API
//!
//! Action and draft bodies are free-form JSON; only query strings are typed.

use serde::Deserialize;

/// Query string of `POST /actions/{operation}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionQuery {
    /// Skip a fresh cache entry and fetch again
    #[serde(default)]
    pub refetch: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_query_defaults_to_cached_read() {
        let query: ActionQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.refetch);
    }

    #[test]
    fn test_action_query_refetch() {
        let query: ActionQuery = serde_json::from_str(r#"{"refetch": true}"#).unwrap();
        assert!(query.refetch);
    }
}
