//! Display categories, text rendering and clipboard export of a report.

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::report::{AnalysisReport, ReportError};
use crate::system::{self, ClipboardError, ClipboardHold};

/// How long the "copied" acknowledgment stays up after a copy.
pub const COPY_ACK_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// What a raw model label is shown as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayCategory {
    Positive,
    Negative,
    Neutral,
    /// Failed classification or a label we do not recognize.
    Error,
}

impl DisplayCategory {
    /// Case-insensitive. Matches the words `positive`/`negative`/`neutral` anywhere in the
    /// label, or the bare class codes `label_2`/`label_0`/`label_1`.
    pub fn from_label(raw: &str) -> Self {
        let label = raw.trim().to_lowercase();
        if label.contains("positive") || label == "label_2" {
            Self::Positive
        } else if label.contains("negative") || label == "label_0" {
            Self::Negative
        } else if label.contains("neutral") || label == "label_1" {
            Self::Neutral
        } else {
            Self::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for DisplayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result cards, one per comment, then a summary line.
pub fn render_report(report: &AnalysisReport) -> String {
    const INDENT: &str = "                   ";

    let mut out = String::new();
    for comment in report.comments() {
        let category = DisplayCategory::from_label(&comment.sentiment);
        let mut lines = comment.text.lines();
        let first = lines.next().unwrap_or_default();
        out.push_str(&format!(
            "{:<10} {:>6.1}%  {}\n",
            format!("[{category}]"),
            comment.score * 100.0,
            first
        ));
        for line in lines {
            out.push_str(INDENT);
            out.push_str(line);
            out.push('\n');
        }
        if let Some(error) = &comment.error {
            out.push_str(&format!("{INDENT}error: {error}\n"));
        }
    }
    out.push('\n');
    out.push_str(&report.to_string());
    out.push('\n');
    out
}

/// The JSON users copy or save.
pub fn report_json(report: &AnalysisReport) -> Result<String, ReportError> {
    report.to_pretty_json()
}

/// A completed copy. Front ends show a "copied" state while it is active.
#[derive(Debug, Clone, Copy)]
pub struct CopyAcknowledgment {
    copied_at: Instant,
}

impl CopyAcknowledgment {
    pub fn new(copied_at: Instant) -> Self {
        Self { copied_at }
    }

    pub fn copied_at(&self) -> Instant {
        self.copied_at
    }

    pub fn expires_at(&self) -> Instant {
        self.copied_at + COPY_ACK_DURATION
    }

    pub fn is_active_at(&self, now: Instant) -> bool {
        now < self.expires_at()
    }

    /// Button label for the copy action at `now`.
    pub fn label_at(&self, now: Instant) -> &'static str {
        if self.is_active_at(now) {
            "Copied"
        } else {
            "Copy"
        }
    }
}

/// Serializes the report and puts it on the clipboard. The returned hold keeps the contents
/// served on Linux; release it no earlier than [`CopyAcknowledgment::expires_at`].
pub fn copy_report(
    report: &AnalysisReport,
) -> Result<(CopyAcknowledgment, ClipboardHold), ExportError> {
    copy_report_with(report, system::set_clipboard_text)
}

fn copy_report_with<H, W>(
    report: &AnalysisReport,
    write: W,
) -> Result<(CopyAcknowledgment, H), ExportError>
where
    W: FnOnce(&str) -> Result<H, ClipboardError>,
{
    let json = report_json(report)?;
    let hold = write(&json)?;
    // The acknowledgment starts once the contents are on the clipboard.
    let ack = CopyAcknowledgment::new(Instant::now());
    info!(bytes = json.len(), "Report copied to clipboard");
    Ok((ack, hold))
}
