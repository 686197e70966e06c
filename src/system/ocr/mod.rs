//! OCR (Optical Character Recognition) functionality
//!
//! The engine itself is opaque: an [`OcrEngine`] hands out one [`OcrSession`] per extraction
//! and [`extract_text`] always closes that session before returning.

mod hosted;
mod prepare;

pub use hosted::HostedOcrEngine;
pub use prepare::{prepare_image, PreparedImage};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::inference::InferenceError;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Image is unreadable: {0}")]
    UnreadableImage(String),
    #[error("Image conversion failed: {0}")]
    ImageConversion(String),
    #[error("OCR engine could not be initialized: {0}")]
    Engine(String),
    #[error("Text recognition failed: {0}")]
    Recognition(#[from] InferenceError),
}

/// Coarse extraction progress, reported in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrProgress {
    Preparing,
    Recognizing { bytes: usize },
    Done { chars: usize },
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Acquires an engine session for a single extraction.
    async fn open(&self, api_key: &str) -> Result<Box<dyn OcrSession>, OcrError>;
}

#[async_trait]
pub trait OcrSession: Send {
    async fn recognize(&mut self, image: &PreparedImage) -> Result<String, OcrError>;

    /// Releases the session. Called exactly once, whether or not `recognize` succeeded.
    async fn close(self: Box<Self>);
}

/// Runs one extraction: prepare the image, open a session, recognize, close.
pub async fn extract_text<E>(
    engine: &E,
    api_key: &str,
    image_bytes: &[u8],
    max_dimension: u32,
    progress: &(dyn Fn(OcrProgress) + Send + Sync),
) -> Result<String, OcrError>
where
    E: OcrEngine + ?Sized,
{
    progress(OcrProgress::Preparing);
    let image = prepare_image(image_bytes, max_dimension)?;
    debug!(
        width = image.width,
        height = image.height,
        mime = image.mime,
        bytes = image.bytes.len(),
        "Image prepared for OCR"
    );

    let mut session = engine.open(api_key).await?;

    progress(OcrProgress::Recognizing {
        bytes: image.bytes.len(),
    });
    let result = session.recognize(&image).await;
    session.close().await;

    match result {
        Ok(text) => {
            info!(chars = text.chars().count(), "OCR completed");
            progress(OcrProgress::Done {
                chars: text.chars().count(),
            });
            Ok(text)
        }
        Err(e) => {
            warn!(error = %e, "OCR failed");
            Err(e)
        }
    }
}
