//! Request normalizer: authorize, then validate, else pass through.

use chrono::Utc;
use serde_json::Value;

use crate::error::{ActionError, Result};
use crate::schema::{validate, NormalizedParams, Schema};
use crate::session::Session;

/// Raw input of one action call.
#[derive(Debug, Clone)]
pub struct ActionRequest<'a> {
    pub params: Value,
    pub schema: Option<&'a Schema>,
    pub authorize: bool,
}

impl<'a> ActionRequest<'a> {
    pub fn new(params: Value) -> Self {
        Self {
            params,
            schema: None,
            authorize: false,
        }
    }

    pub fn with_schema(mut self, schema: Option<&'a Schema>) -> Self {
        self.schema = schema;
        self
    }

    pub fn authorized(mut self, authorize: bool) -> Self {
        self.authorize = authorize;
        self
    }
}

// == Run ==
/// Produces the parameters handed to the endpoint client.
///
/// The session is checked before the parameters are looked at, so an
/// unauthenticated caller never learns anything from validation messages.
pub fn run(request: ActionRequest<'_>, session: Option<&Session>) -> Result<NormalizedParams> {
    if request.authorize && !session.is_some_and(|s| !s.is_expired(Utc::now())) {
        return Err(ActionError::Authorization(String::new()));
    }

    match request.schema {
        Some(schema) => validate(schema, &request.params).map_err(ActionError::Validation),
        None => Ok(NormalizedParams::passthrough(request.params)),
    }
}
