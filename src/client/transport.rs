//! Shared backend transport.
//!
//! Sends one resolved `Endpoint` and returns the parsed body. No retries and no
//! caching happen here.

use std::time::Duration;

use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

use super::endpoints::Endpoint;
use super::envelope::RawResponse;
use crate::config::Config;
use crate::error::{ActionError, Result};

// == Api Client ==
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ActionError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // == Send ==
    /// Performs the request described by `endpoint`.
    ///
    /// Attaches `Authorization: Bearer` when the endpoint requires auth; a
    /// missing token is an authorization error. A 2xx body that is not JSON is
    /// a transport error, a non-2xx body that is not JSON is read as null.
    pub async fn send(&self, endpoint: &Endpoint, token: Option<&str>) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, endpoint.path);
        let mut request = self
            .client
            .request(endpoint.method.as_reqwest(), &url)
            .header(ACCEPT, "application/json");

        if endpoint.auth {
            let token = token.ok_or_else(|| ActionError::Authorization(String::new()))?;
            request = request.bearer_auth(token);
        }
        if let Some(body) = &endpoint.body {
            request = request.json(body);
        }

        debug!(method = %endpoint.method, path = %endpoint.path, "Sending backend request");

        let response = request
            .send()
            .await
            .map_err(|e| ActionError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ActionError::Transport(e.to_string()))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(body) => body,
                Err(e) if (200..300).contains(&status) => {
                    return Err(ActionError::Transport(format!("Invalid JSON body: {}", e)));
                }
                Err(_) => Value::Null,
            }
        };

        debug!(status, path = %endpoint.path, "Backend responded");
        Ok(RawResponse::new(status, body))
    }
}
