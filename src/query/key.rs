//! Query Key Module
//!
//! Cache keys are the ordered tuple (scope, operation, params).

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

// == Query Key ==
/// Identifies one cached read.
///
/// `params` is stored as canonical JSON text; object keys are sorted by
/// `serde_json`, so equal parameter bags always produce equal keys.
/// The scope is a session token and never appears in `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    /// Session the entry belongs to
    pub scope: String,
    /// Operation name, e.g. `list_products`
    pub operation: String,
    /// Canonical JSON of the normalized params
    pub params: String,
}

impl QueryKey {
    pub fn new(scope: impl Into<String>, operation: impl Into<String>, params: &Value) -> Self {
        Self {
            scope: scope.into(),
            operation: operation.into(),
            params: params.to_string(),
        }
    }

    pub fn matches_operation(&self, scope: &str, operations: &[&str]) -> bool {
        self.scope == scope && operations.contains(&self.operation.as_str())
    }
}

/// Short, non-reversible tag for a scope, safe to log.
pub fn scope_fingerprint(scope: &str) -> String {
    let mut hasher = DefaultHasher::new();
    scope.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

impl fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryKey")
            .field("scope", &scope_fingerprint(&self.scope))
            .field("operation", &self.operation)
            .field("params", &self.params)
            .finish()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operation, self.params)
    }
}
