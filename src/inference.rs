//! Hosted inference HTTP plumbing shared by the OCR engine and the sentiment model.
//!
//! Both capabilities live behind the same API shape: `POST {base}/models/{model}` with a
//! bearer token, a JSON (or raw bytes) body, and either a JSON result or `{"error": "..."}`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Could not reach the inference service at {url} ({source})")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Inference service error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response from inference service: {0}")]
    InvalidResponse(String),
}

/// Where a hosted model lives. The API key is not part of the endpoint; it is supplied per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            timeout,
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}/models/{}",
            self.base_url.trim_end_matches('/'),
            self.model.trim_matches('/')
        )
    }

    pub fn client(&self) -> Result<reqwest::Client, InferenceError> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        // Local inference servers are reached directly, never through a system proxy.
        if self.is_loopback() {
            builder = builder.no_proxy();
        }
        builder.build().map_err(InferenceError::Client)
    }

    fn is_loopback(&self) -> bool {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]"))
    }
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: Option<serde_json::Value>,
}

/// Pulls a readable message out of an error body, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .map(|e| match e {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
    match from_json {
        Some(msg) if !msg.trim().is_empty() => msg,
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}

/// Sends a prepared request and decodes the JSON body, mapping non-2xx statuses to `Api`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<T, InferenceError> {
    let resp = request
        .send()
        .await
        .map_err(|source| InferenceError::Unreachable {
            url: url.to_string(),
            source,
        })?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| InferenceError::InvalidResponse(format!("failed to read body: {e}")))?;

    if !status.is_success() {
        let message = error_message(&body);
        warn!(status = status.as_u16(), %url, "Inference service returned error");
        return Err(InferenceError::Api {
            status: status.as_u16(),
            message,
        });
    }

    debug!(status = status.as_u16(), bytes = body.len(), "Inference response received");
    serde_json::from_str(&body).map_err(|e| InferenceError::InvalidResponse(e.to_string()))
}
