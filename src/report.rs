//! The per-submission analysis report and its JSON form.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sentiment::SentimentResult;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Report says {declared} comments but contains {actual}")]
    CountMismatch { declared: usize, actual: usize },
}

/// Results for one submission. `total_comments` always equals the number of comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawReport")]
pub struct AnalysisReport {
    total_comments: usize,
    #[serde(with = "iso_millis")]
    analyzed_at: DateTime<Utc>,
    comments: Vec<SentimentResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    total_comments: usize,
    #[serde(with = "iso_millis")]
    analyzed_at: DateTime<Utc>,
    comments: Vec<SentimentResult>,
}

impl TryFrom<RawReport> for AnalysisReport {
    type Error = ReportError;

    fn try_from(raw: RawReport) -> Result<Self, Self::Error> {
        if raw.total_comments != raw.comments.len() {
            return Err(ReportError::CountMismatch {
                declared: raw.total_comments,
                actual: raw.comments.len(),
            });
        }
        Ok(Self {
            total_comments: raw.total_comments,
            analyzed_at: raw.analyzed_at,
            comments: raw.comments,
        })
    }
}

impl AnalysisReport {
    /// Builds a report stamped with the current time.
    pub fn new(comments: Vec<SentimentResult>) -> Self {
        Self::at(comments, Utc::now())
    }

    /// Builds a report stamped with `analyzed_at`, truncated to milliseconds.
    pub fn at(comments: Vec<SentimentResult>, analyzed_at: DateTime<Utc>) -> Self {
        let analyzed_at = analyzed_at
            .duration_trunc(TimeDelta::milliseconds(1))
            .unwrap_or(analyzed_at);
        Self {
            total_comments: comments.len(),
            analyzed_at,
            comments,
        }
    }

    pub fn total_comments(&self) -> usize {
        self.total_comments
    }

    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }

    pub fn comments(&self) -> &[SentimentResult] {
        &self.comments
    }

    pub fn error_count(&self) -> usize {
        self.comments.iter().filter(|c| c.is_error()).count()
    }

    /// Two-space indented JSON, the form users copy and export.
    pub fn to_pretty_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let raw: RawReport = serde_json::from_str(json)?;
        raw.try_into()
    }
}

/// `2026-10-16T09:30:12.345Z`
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} comment(s) analyzed at {}",
            self.total_comments,
            self.analyzed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}
