//! Endpoint descriptors: method, path and body of one backend call.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ActionError;
use crate::schema::NormalizedParams;

// == HTTP Method ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

// == Endpoint ==
/// A fully resolved backend request. Authenticated unless built with `public()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub auth: bool,
}

impl Endpoint {
    fn new(method: HttpMethod, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            auth: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, None)
    }

    pub fn post(path: impl Into<String>, body: NormalizedParams) -> Self {
        Self::new(HttpMethod::Post, path, Some(body.into_value()))
    }

    pub fn patch(path: impl Into<String>, body: NormalizedParams) -> Self {
        Self::new(HttpMethod::Patch, path, Some(body.into_value()))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path, None)
    }

    /// Marks the endpoint as callable without a bearer credential.
    pub fn public(mut self) -> Self {
        self.auth = false;
        self
    }
}

// == Path Ids ==
/// Removes the `id` parameter and renders it as a path segment.
pub fn take_id(params: &mut NormalizedParams, key: &str) -> Result<String, ActionError> {
    match params.take(key) {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => Ok(s),
        _ => Err(ActionError::application(format!("Missing or invalid {}", key))),
    }
}
