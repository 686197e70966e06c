//! Hosted text-classification model reached over the inference API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{LabelScore, SentimentModel};
use crate::inference::{self, Endpoint, InferenceError};

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

pub struct HostedSentimentModel {
    endpoint: Endpoint,
}

impl HostedSentimentModel {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl SentimentModel for HostedSentimentModel {
    async fn predict(&self, text: &str, api_key: &str) -> Result<Vec<LabelScore>, InferenceError> {
        let url = self.endpoint.url();
        let request = self
            .endpoint
            .client()?
            .post(&url)
            .bearer_auth(api_key)
            .json(&ClassifyRequest { inputs: text });
        let value: Value = inference::send_json(request, &url).await?;
        parse_predictions(value)
    }
}

/// Accepts `[{label, score}, ...]` or the batched `[[{label, score}, ...]]` form.
pub(crate) fn parse_predictions(value: Value) -> Result<Vec<LabelScore>, InferenceError> {
    let value = match value {
        Value::Array(mut outer) if matches!(outer.first(), Some(Value::Array(_))) => {
            outer.swap_remove(0)
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|e| InferenceError::InvalidResponse(e.to_string()))
}
