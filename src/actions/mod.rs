//! Actions Module
//!
//! Runs one catalog operation end to end: normalize the request, map it to
//! a backend endpoint, send it, interpret the envelope. Reads go through the
//! query cache; writes invalidate the reads they affect.

mod normalize;

pub use normalize::{run, ActionRequest};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{interpret, ApiClient, Envelope};
use crate::error::{ActionError, Result};
use crate::messages::{Locale, Message};
use crate::operations::Operation;
use crate::query::{QueryClient, QueryKey, QueryState};
use crate::session::Session;

/// Cache scope of reads made without a session.
pub const PUBLIC_SCOPE: &str = "public";

// == Actions ==
#[derive(Clone)]
pub struct Actions {
    api: ApiClient,
    queries: QueryClient,
    locale: Locale,
}

impl Actions {
    pub fn new(api: ApiClient, queries: QueryClient, locale: Locale) -> Self {
        Self {
            api,
            queries,
            locale,
        }
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    // == Execute ==
    /// Runs `operation` with raw `params` on behalf of `session`.
    ///
    /// `refetch` forces a read past a fresh cache entry; it is ignored for
    /// writes.
    pub async fn execute(
        &self,
        operation: Operation,
        params: Value,
        session: Option<&Session>,
        refetch: bool,
    ) -> Result<Envelope> {
        let request = ActionRequest::new(operation.prepare_params(params))
            .with_schema(operation.schema())
            .authorized(operation.requires_auth());
        let params = run(request, session)?;

        let token = session.map(|s| s.token.clone());
        let scope = session
            .map(|s| s.token.as_str())
            .unwrap_or(PUBLIC_SCOPE)
            .to_string();
        let key_params = params.as_map().clone();
        let endpoint = operation.endpoint(params)?;

        if operation.is_query() {
            let key = QueryKey::new(scope, operation.name(), &Value::Object(key_params));
            let api = self.api.clone();
            let locale = self.locale;
            let fetch = move || {
                let api = api.clone();
                let endpoint = endpoint.clone();
                let token = token.clone();
                async move {
                    let raw = api.send(&endpoint, token.as_deref()).await?;
                    interpret(raw, locale)
                }
            };

            let state = if refetch {
                self.queries.refetch(key, fetch).await
            } else {
                self.queries.query(key, fetch).await
            };
            return self.settle(operation, state);
        }

        let outcome = self
            .api
            .send(&endpoint, token.as_deref())
            .await
            .and_then(|raw| interpret(raw, self.locale));
        let envelope = match outcome {
            Ok(envelope) => envelope,
            Err(err) => {
                if let ActionError::Transport(detail) = &err {
                    warn!(operation = %operation, "Backend transport failure: {}", detail);
                }
                return Err(err);
            }
        };

        let stale = operation.invalidates();
        if !stale.is_empty() {
            let count = self.queries.invalidate(&scope, stale).await;
            info!(operation = %operation, count, "Mutation invalidated cached queries");
        }
        Ok(envelope)
    }

    /// Turns a query state into the action outcome. Last-known data is
    /// served over a failed refresh, except when the session was rejected.
    fn settle(&self, operation: Operation, state: QueryState) -> Result<Envelope> {
        debug!(operation = %operation, status = ?state.status, "Query settled");
        match (state.data, state.error) {
            (_, Some(err @ ActionError::Authorization(_))) => Err(err),
            (Some(data), Some(err)) => {
                warn!(operation = %operation, "Serving last-known data after failure: {}", err);
                Ok(data)
            }
            (Some(data), None) => Ok(data),
            (None, Some(err)) => Err(err),
            (None, None) => Err(ActionError::application(
                self.locale.text(Message::UnexpectedResponse),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryConfig, RetryPolicy};
    use crate::session::UserProfile;
    use serde_json::json;
    use std::time::Duration;

    /// Nothing listens on the discard port: any backend call would fail
    /// with a transport error.
    fn offline_actions() -> Actions {
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let queries = QueryClient::new(QueryConfig {
            retry: RetryPolicy::none(),
            ..QueryConfig::default()
        });
        Actions::new(api, queries, Locale::En)
    }

    fn session() -> Session {
        Session::new("tok", UserProfile::default(), chrono::Duration::days(7))
    }

    #[tokio::test]
    async fn test_rejected_order_without_reason_never_reaches_backend() {
        let actions = offline_actions();
        let result = actions
            .execute(
                Operation::UpdateOrderStatus,
                json!({"id": 3, "status": "rejected", "reason": ""}),
                Some(&session()),
                false,
            )
            .await;

        match result {
            Err(ActionError::Validation(errors)) => assert!(errors.contains("reason")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_protected_operation_without_session() {
        let actions = offline_actions();
        let result = actions
            .execute(Operation::ListProducts, json!({}), None, false)
            .await;
        assert!(matches!(result, Err(ActionError::Authorization(_))));
        assert_eq!(actions.queries().len().await, 0);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_transport_error() {
        let actions = offline_actions();
        let result = actions
            .execute(Operation::ListProducts, json!({}), Some(&session()), false)
            .await;
        assert!(matches!(result, Err(ActionError::Transport(_))));
    }
}
