//! Result Envelope Module
//!
//! Converts raw backend responses into the uniform success/error envelope.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ActionError;
use crate::messages::{Locale, Message};
use crate::schema::FieldErrors;

// == Pagination ==
/// Pagination metadata of a list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

/// Navigation links of a list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationLinks {
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

// == Raw Response ==
/// Status and parsed JSON body as received from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_http_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// == Envelope ==
/// Successful payload with optional pagination details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub data: Value,
    pub meta: Option<PaginationMeta>,
    pub links: Option<PaginationLinks>,
}

impl Envelope {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            meta: None,
            links: None,
        }
    }
}

// == Action Result ==
/// Uniform envelope returned by every action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult<T> {
    Success {
        data: T,
        meta: Option<PaginationMeta>,
        links: Option<PaginationLinks>,
    },
    Error {
        message: String,
        field_errors: Option<FieldErrors>,
    },
}

impl<T> ActionResult<T> {
    pub fn success(data: T) -> Self {
        ActionResult::Success {
            data,
            meta: None,
            links: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ActionResult::Error {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ActionResult::Success { data, .. } => Some(data),
            ActionResult::Error { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ActionResult::Success { .. } => None,
            ActionResult::Error { message, .. } => Some(message),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ActionResult::Error { field_errors, .. } => field_errors.as_ref(),
            ActionResult::Success { .. } => None,
        }
    }
}

impl From<Envelope> for ActionResult<Value> {
    fn from(envelope: Envelope) -> Self {
        ActionResult::Success {
            data: envelope.data,
            meta: envelope.meta,
            links: envelope.links,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>")
)]
struct WireResult<T> {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<PaginationMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    links: Option<PaginationLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_errors: Option<FieldErrors>,
}

impl<T: Serialize> Serialize for ActionResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            ActionResult::Success { data, meta, links } => WireResult {
                success: true,
                data: Some(data),
                meta: meta.clone(),
                links: links.clone(),
                message: None,
                field_errors: None,
            },
            ActionResult::Error {
                message,
                field_errors,
            } => WireResult {
                success: false,
                data: None,
                meta: None,
                links: None,
                message: Some(message.clone()),
                field_errors: field_errors.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ActionResult<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireResult::<T>::deserialize(deserializer)?;
        if wire.success {
            // `"data": null` arrives as None; let T decide whether null is valid.
            let data = match wire.data {
                Some(data) => data,
                None => T::deserialize(Value::Null).map_err(de::Error::custom)?,
            };
            Ok(ActionResult::Success {
                data,
                meta: wire.meta,
                links: wire.links,
            })
        } else {
            Ok(ActionResult::Error {
                message: wire
                    .message
                    .ok_or_else(|| de::Error::missing_field("message"))?,
                field_errors: wire.field_errors,
            })
        }
    }
}

// == Interpret ==
/// Classifies a raw response as an envelope or an application error.
///
/// An explicit error marker in the body (`result: "Error"`, `status: "error"`,
/// `success: false`) or a non-2xx status is an error. 401/403 become
/// authorization errors.
pub fn interpret(response: RawResponse, locale: Locale) -> Result<Envelope, ActionError> {
    if has_error_marker(&response.body) || !response.is_http_success() {
        return Err(error_from(response, locale));
    }

    match response.body {
        Value::Object(mut body) if body.contains_key("data") => {
            let data = body.remove("data").unwrap_or(Value::Null);
            let meta = body
                .remove("meta")
                .and_then(|m| serde_json::from_value(m).ok());
            let links = body
                .remove("links")
                .and_then(|l| serde_json::from_value(l).ok());
            Ok(Envelope { data, meta, links })
        }
        other => Ok(Envelope::new(other)),
    }
}

fn has_error_marker(body: &Value) -> bool {
    let marker = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .is_some_and(|v| v.eq_ignore_ascii_case("error"))
    };
    marker("result") || marker("status") || body.get("success") == Some(&Value::Bool(false))
}

fn error_from(response: RawResponse, locale: Locale) -> ActionError {
    let message = response
        .body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string);
    debug!(status = response.status, ?message, "backend reported an error");

    if response.status == 401 || response.status == 403 {
        return ActionError::Authorization(
            message.unwrap_or_else(|| locale.text(Message::SessionExpired).to_string()),
        );
    }

    ActionError::Application {
        message: message.unwrap_or_else(|| locale.text(Message::RequestFailed).to_string()),
        field_errors: response.body.get("errors").and_then(field_errors_from),
    }
}

/// Reads `{"field": ["msg", ...]}` or `{"field": "msg"}`.
fn field_errors_from(errors: &Value) -> Option<FieldErrors> {
    let map = errors.as_object()?;
    let fields: FieldErrors = map
        .iter()
        .filter_map(|(field, messages)| {
            let messages: Vec<String> = match messages {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => return None,
            };
            (!messages.is_empty()).then(|| (field.clone(), messages))
        })
        .collect();
    (!fields.is_empty()).then_some(fields)
}

// == Map ==
/// Maps a transport outcome to an `ActionResult`. Never panics or propagates.
pub fn map_response(
    outcome: Result<RawResponse, ActionError>,
    locale: Locale,
) -> ActionResult<Value> {
    match outcome.and_then(|response| interpret(response, locale)) {
        Ok(envelope) => envelope.into(),
        Err(err) => {
            if let ActionError::Transport(detail) = &err {
                warn!("Backend transport failure: {}", detail);
            }
            err.into_result(locale)
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paginated_success() {
        let raw = RawResponse::new(
            200,
            json!({
                "data": [{"id": 1, "name": "Panadol"}],
                "links": {"first": "/products?page=1", "next": null},
                "meta": {"current_page": 1, "last_page": 3, "per_page": 15, "total": 40}
            }),
        );

        let result = map_response(Ok(raw), Locale::En);
        match result {
            ActionResult::Success { data, meta, links } => {
                assert_eq!(data, json!([{"id": 1, "name": "Panadol"}]));
                assert_eq!(meta.unwrap().total, Some(40));
                assert_eq!(links.unwrap().first.as_deref(), Some("/products?page=1"));
            }
            ActionResult::Error { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn test_payload_without_data_key_is_the_data() {
        let raw = RawResponse::new(200, json!({"id": 4, "status": "accepted"}));
        let result = map_response(Ok(raw), Locale::En);
        assert_eq!(result.data(), Some(&json!({"id": 4, "status": "accepted"})));
    }

    #[test]
    fn test_result_error_marker_with_200() {
        let raw = RawResponse::new(200, json!({"result": "Error", "message": "Out of stock"}));
        let result = map_response(Ok(raw), Locale::En);
        assert!(!result.is_success());
        assert_eq!(result.message(), Some("Out of stock"));
        assert!(result.data().is_none());
    }

    #[test]
    fn test_http_failure_without_message_uses_localized_fallback() {
        let raw = RawResponse::new(500, Value::Null);
        let result = map_response(Ok(raw), Locale::Ar);
        assert_eq!(result.message(), Some(Locale::Ar.text(Message::RequestFailed)));
    }

    #[test]
    fn test_field_errors_are_carried() {
        let raw = RawResponse::new(
            422,
            json!({"message": "The given data was invalid.", "errors": {"email": ["Taken"], "phone": "Invalid"}}),
        );
        let result = map_response(Ok(raw), Locale::En);
        let fields = result.field_errors().unwrap();
        assert_eq!(fields["email"], vec!["Taken".to_string()]);
        assert_eq!(fields["phone"], vec!["Invalid".to_string()]);
    }

    #[test]
    fn test_unauthorized_status_is_authorization_error() {
        let raw = RawResponse::new(401, json!({"message": "Unauthenticated."}));
        let err = interpret(raw, Locale::En).unwrap_err();
        assert_eq!(err, ActionError::Authorization("Unauthenticated.".into()));
    }

    #[test]
    fn test_transport_error_becomes_error_envelope() {
        let result = map_response(Err(ActionError::Transport("reset".into())), Locale::En);
        assert_eq!(result.message(), Some(Locale::En.text(Message::NetworkFailure)));
    }

    #[test]
    fn test_wire_format() {
        let ok: ActionResult<Value> = ActionResult::success(json!({"id": 1}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"success": true, "data": {"id": 1}})
        );

        let err: ActionResult<Value> = ActionResult::error("Nope");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"success": false, "message": "Nope"})
        );
    }

    #[test]
    fn test_deserialize_null_data() {
        let parsed: ActionResult<Value> =
            serde_json::from_value(json!({"success": true, "data": null})).unwrap();
        assert_eq!(parsed.data(), Some(&Value::Null));

        let parsed: ActionResult<Value> =
            serde_json::from_value(json!({"success": false, "message": "x", "fieldErrors": {"a": ["b"]}}))
                .unwrap();
        assert_eq!(parsed.field_errors().unwrap()["a"], vec!["b".to_string()]);
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Batch {
        number: String,
    }

    #[test]
    fn test_deserialize_payload_without_default() {
        let parsed: ActionResult<Batch> =
            serde_json::from_value(json!({"success": true, "data": {"number": "B-7"}})).unwrap();
        assert_eq!(parsed.data(), Some(&Batch { number: "B-7".to_string() }));

        let missing: Result<ActionResult<Batch>, _> =
            serde_json::from_value(json!({"success": true}));
        assert!(missing.is_err());
    }
}
