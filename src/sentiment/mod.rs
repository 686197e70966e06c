//! Sentiment classification of single comments.
//!
//! [`classify`] never fails: a model error becomes an in-band result with the `"error"` label so
//! one bad comment does not abort a batch.

mod hosted;

pub use hosted::HostedSentimentModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::inference::InferenceError;

/// Label used for comments whose classification failed.
pub const ERROR_LABEL: &str = "error";
/// Label used when the model answered with no predictions.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Outcome for one comment, as exported in the JSON report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub text: String,
    pub sentiment: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SentimentResult {
    pub fn failed(text: &str, message: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            sentiment: ERROR_LABEL.to_string(),
            score: 0.0,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One label/confidence pair as returned by a classification model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Returns the model's predictions for `text`, best first.
    async fn predict(&self, text: &str, api_key: &str) -> Result<Vec<LabelScore>, InferenceError>;
}

/// Classifies one comment, taking the model's first prediction.
pub async fn classify<M>(model: &M, text: &str, api_key: &str) -> SentimentResult
where
    M: SentimentModel + ?Sized,
{
    match model.predict(text, api_key).await {
        Ok(predictions) => {
            let result = match predictions.into_iter().next() {
                Some(top) => SentimentResult {
                    text: text.to_string(),
                    sentiment: if top.label.trim().is_empty() {
                        UNKNOWN_LABEL.to_string()
                    } else {
                        top.label
                    },
                    // Scores stay finite and within [0, 1].
                    score: if top.score.is_finite() {
                        top.score.clamp(0.0, 1.0)
                    } else {
                        0.0
                    },
                    error: None,
                },
                None => SentimentResult {
                    text: text.to_string(),
                    sentiment: UNKNOWN_LABEL.to_string(),
                    score: 0.0,
                    error: None,
                },
            };
            debug!(
                len = text.len(),
                sentiment = %result.sentiment,
                score = result.score,
                "Comment classified"
            );
            result
        }
        Err(e) => {
            warn!(len = text.len(), error = %e, "Sentiment classification failed");
            SentimentResult::failed(text, e.to_string())
        }
    }
}
