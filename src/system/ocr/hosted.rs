//! Hosted image-to-text engine reached over the inference API.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use super::{OcrEngine, OcrError, OcrSession, PreparedImage};
use crate::inference::{self, Endpoint, InferenceError};

pub struct HostedOcrEngine {
    endpoint: Endpoint,
}

impl HostedOcrEngine {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl OcrEngine for HostedOcrEngine {
    async fn open(&self, api_key: &str) -> Result<Box<dyn OcrSession>, OcrError> {
        let client = self
            .endpoint
            .client()
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        let session_id = nanoid::nanoid!(8);
        debug!(%session_id, model = %self.endpoint.model, "OCR session opened");
        Ok(Box::new(HostedOcrSession {
            client,
            url: self.endpoint.url(),
            api_key: api_key.to_string(),
            session_id,
        }))
    }
}

struct HostedOcrSession {
    client: reqwest::Client,
    url: String,
    api_key: String,
    session_id: String,
}

#[async_trait]
impl OcrSession for HostedOcrSession {
    async fn recognize(&mut self, image: &PreparedImage) -> Result<String, OcrError> {
        debug!(
            session_id = %self.session_id,
            bytes = image.bytes.len(),
            "Sending image to OCR model"
        );
        let request = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, image.mime)
            .body(image.bytes.clone());
        let value: Value = inference::send_json(request, &self.url).await?;
        Ok(parse_generated_text(&value)?)
    }

    async fn close(self: Box<Self>) {
        debug!(session_id = %self.session_id, "OCR session closed");
    }
}

/// Accepts `[{"generated_text": ...}]` or `{"generated_text": ...}`. A missing field is empty text.
pub(crate) fn parse_generated_text(value: &Value) -> Result<String, InferenceError> {
    let item = match value {
        Value::Array(items) => match items.first() {
            Some(item) => item,
            None => return Ok(String::new()),
        },
        Value::Object(_) => value,
        other => {
            return Err(InferenceError::InvalidResponse(format!(
                "expected an object or array, got {other}"
            )))
        }
    };

    Ok(item
        .get("generated_text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}
