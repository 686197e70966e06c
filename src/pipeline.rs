//! Submission pipeline: OCR and manual text into comments, comments into a report.
//!
//! Everything runs sequentially on the caller's task. An [`Analyzer`] accepts one submission at
//! a time; a second call while one is in flight is rejected rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

use crate::report::AnalysisReport;
use crate::segmenter;
use crate::sentiment::{self, SentimentModel};
use crate::system::{self, OcrEngine, OcrError, OcrProgress};

/// Lines shorter than this are dropped from OCR output by default.
pub const DEFAULT_MIN_LINE_LENGTH: usize = 3;
/// Longest image side sent to OCR by default, in pixels.
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 2048;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("a submission is already in progress")]
    Busy,
    #[error("missing API key")]
    MissingApiKey,
    #[error("enter a comment or attach an image")]
    NoInput,
    #[error("could not extract text from the image: {0}")]
    Extraction(#[from] OcrError),
    #[error("no usable text found in the image")]
    NoTextInImage,
}

/// What the user supplied.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub manual_text: Option<String>,
    pub image: Option<Vec<u8>>,
}

impl Submission {
    pub fn new(manual_text: Option<String>, image: Option<Vec<u8>>) -> Self {
        Self { manual_text, image }
    }

    fn manual_comment(&self) -> Option<&str> {
        self.manual_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Per-submission settings, passed in explicitly on every run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: Option<String>,
    pub min_line_length: usize,
    pub max_image_dimension: u32,
}

impl PipelineConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            min_line_length: DEFAULT_MIN_LINE_LENGTH,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }
}

/// Clears the busy flag when the submission ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Analyzer<E, M> {
    ocr: E,
    model: M,
    busy: AtomicBool,
}

impl<E, M> Analyzer<E, M>
where
    E: OcrEngine,
    M: SentimentModel,
{
    pub fn new(ocr: E, model: M) -> Self {
        Self {
            ocr,
            model,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn ocr(&self) -> &E {
        &self.ocr
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Runs one submission end to end. Fatal problems abort with a [`SubmissionError`] and
    /// nothing classified so far is kept; per-comment model failures are recorded in the report.
    pub async fn run_submission(
        &self,
        submission: &Submission,
        config: &PipelineConfig,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<AnalysisReport, SubmissionError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return Err(SubmissionError::Busy);
        };

        let submission_id = nanoid::nanoid!(10);
        self.run_inner(submission, config, progress)
            .instrument(info_span!("submission", %submission_id))
            .await
    }

    async fn run_inner(
        &self,
        submission: &Submission,
        config: &PipelineConfig,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<AnalysisReport, SubmissionError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(SubmissionError::MissingApiKey)?;

        let manual = submission.manual_comment();
        if manual.is_none() && submission.image.is_none() {
            return Err(SubmissionError::NoInput);
        }

        let mut comments = Vec::new();

        if let Some(image) = &submission.image {
            let text = system::extract_text(
                &self.ocr,
                api_key,
                image,
                config.max_image_dimension,
                progress,
            )
            .await?;

            let from_image: Vec<String> = segmenter::segment(&text, config.min_line_length)
                .into_iter()
                .filter(|c| !c.trim().is_empty())
                .collect();
            if from_image.is_empty() {
                return Err(SubmissionError::NoTextInImage);
            }
            debug!(count = from_image.len(), "Comments segmented from image");
            comments.extend(from_image);
        }

        if let Some(text) = manual {
            comments.push(text.to_string());
        }

        if comments.is_empty() {
            return Err(SubmissionError::NoInput);
        }

        info!(count = comments.len(), "Classifying comments");
        let mut results = Vec::with_capacity(comments.len());
        for comment in &comments {
            results.push(sentiment::classify(&self.model, comment, api_key).await);
        }

        let report = AnalysisReport::new(results);
        info!(
            total = report.total_comments(),
            errors = report.error_count(),
            "Submission analyzed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::inference::InferenceError;
    use crate::presentation::DisplayCategory;
    use crate::sentiment::testing::{FixedModel, FlakyModel};
    use crate::sentiment::LabelScore;
    use crate::system::ocr::testing::{png_bytes, ScriptedEngine};

    fn manual(text: &str) -> Submission {
        Submission::new(Some(text.to_string()), None)
    }

    fn with_image(text: Option<&str>) -> Submission {
        Submission::new(text.map(str::to_string), Some(png_bytes(8, 8)))
    }

    #[tokio::test]
    async fn test_manual_text_only() {
        let analyzer = Analyzer::new(
            ScriptedEngine::returning("unused"),
            FixedModel::new("positive", 0.95),
        );
        let report = analyzer
            .run_submission(
                &manual("Great product!"),
                &PipelineConfig::with_api_key("hf_test"),
                &|_| {},
            )
            .await
            .unwrap();

        assert_eq!(report.total_comments(), 1);
        assert_eq!(report.comments()[0].text, "Great product!");
        assert_eq!(
            DisplayCategory::from_label(&report.comments()[0].sentiment),
            DisplayCategory::Positive
        );
        assert_eq!(analyzer.ocr().counters.opened(), 0);
    }

    #[tokio::test]
    async fn test_rejects_missing_or_blank_api_key() {
        let analyzer = Analyzer::new(
            ScriptedEngine::returning("text"),
            FixedModel::new("positive", 0.9),
        );
        for key in [None, Some(String::new()), Some("   ".to_string())] {
            let config = PipelineConfig {
                api_key: key,
                ..PipelineConfig::default()
            };
            let err = analyzer
                .run_submission(&manual("hello"), &config, &|_| {})
                .await
                .unwrap_err();
            assert!(matches!(err, SubmissionError::MissingApiKey));
            assert_eq!(err.to_string(), "missing API key");
        }
        assert!(analyzer.model().seen().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_no_input() {
        let analyzer = Analyzer::new(
            ScriptedEngine::returning("text"),
            FixedModel::new("positive", 0.9),
        );
        let config = PipelineConfig::with_api_key("hf_test");
        for submission in [Submission::default(), manual("   \n  ")] {
            let err = analyzer
                .run_submission(&submission, &config, &|_| {})
                .await
                .unwrap_err();
            assert!(matches!(err, SubmissionError::NoInput));
        }
    }

    #[tokio::test]
    async fn test_image_lines_then_manual_text_in_order() {
        let analyzer = Analyzer::new(
            ScriptedEngine::returning("Good\nok\nTerrible service today"),
            FixedModel::new("neutral", 0.5),
        );
        let config = PipelineConfig {
            min_line_length: 3,
            ..PipelineConfig::with_api_key("hf_test")
        };
        let report = analyzer
            .run_submission(&with_image(Some("  also typed  ")), &config, &|_| {})
            .await
            .unwrap();

        let texts: Vec<&str> = report.comments().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["Good", "Terrible service today", "also typed"]);
        assert_eq!(report.total_comments(), 3);
        assert_eq!(
            analyzer.model().seen(),
            ["Good", "Terrible service today", "also typed"]
        );
        assert_eq!(analyzer.ocr().counters.closed(), 1);
    }

    #[tokio::test]
    async fn test_ocr_failure_aborts_without_classifying() {
        let analyzer = Analyzer::new(
            ScriptedEngine::failing("engine exploded"),
            FixedModel::new("positive", 0.9),
        );
        let err = analyzer
            .run_submission(
                &with_image(Some("typed too")),
                &PipelineConfig::with_api_key("hf_test"),
                &|_| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Extraction(_)));
        assert!(analyzer.model().seen().is_empty());
        assert_eq!(analyzer.ocr().counters.closed(), 1);
        assert!(!analyzer.is_busy());
    }

    #[tokio::test]
    async fn test_blank_ocr_output_is_rejected() {
        let analyzer = Analyzer::new(
            ScriptedEngine::returning("  \n \n"),
            FixedModel::new("positive", 0.9),
        );
        let err = analyzer
            .run_submission(
                &with_image(None),
                &PipelineConfig::with_api_key("hf_test"),
                &|_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::NoTextInImage));
    }

    #[tokio::test]
    async fn test_short_ocr_output_falls_back_to_whole_text() {
        let analyzer = Analyzer::new(
            ScriptedEngine::returning("ok"),
            FixedModel::new("positive", 0.9),
        );
        let report = analyzer
            .run_submission(
                &with_image(None),
                &PipelineConfig::with_api_key("hf_test"),
                &|_| {},
            )
            .await
            .unwrap();
        assert_eq!(report.comments()[0].text, "ok");
    }

    #[tokio::test]
    async fn test_classifier_failure_stays_in_band() {
        let analyzer = Analyzer::new(
            ScriptedEngine::returning("fine comment\nboom comment\nlast comment"),
            FlakyModel {
                trigger: "boom".into(),
            },
        );
        let report = analyzer
            .run_submission(
                &with_image(None),
                &PipelineConfig::with_api_key("hf_test"),
                &|_| {},
            )
            .await
            .unwrap();

        assert_eq!(report.total_comments(), 3);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.comments()[1].sentiment, "error");
        assert_eq!(report.comments()[2].sentiment, "positive");
    }

    /// Blocks inside `predict` until released, so a submission can be held in flight.
    struct GatedModel {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl SentimentModel for GatedModel {
        async fn predict(&self, _: &str, _: &str) -> Result<Vec<LabelScore>, InferenceError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![LabelScore {
                label: "positive".into(),
                score: 1.0,
            }])
        }
    }

    #[tokio::test]
    async fn test_second_submission_while_busy_is_rejected() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let analyzer = Arc::new(Analyzer::new(
            ScriptedEngine::returning("unused"),
            GatedModel {
                entered: entered.clone(),
                release: release.clone(),
            },
        ));
        let config = PipelineConfig::with_api_key("hf_test");

        let first = {
            let analyzer = analyzer.clone();
            let config = config.clone();
            tokio::spawn(async move {
                analyzer
                    .run_submission(&manual("first"), &config, &|_| {})
                    .await
            })
        };

        entered.notified().await;
        assert!(analyzer.is_busy());
        let err = analyzer
            .run_submission(&manual("second"), &config, &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Busy));

        release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.total_comments(), 1);
        assert!(!analyzer.is_busy());
    }
}
