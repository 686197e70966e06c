//! Image validation and downscaling before upload.

use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageFormat;

use super::OcrError;

/// Image bytes ready to send to an OCR engine.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Decodes `bytes` to make sure they are an image, then shrinks anything whose longest side
/// exceeds `max_dimension` (0 disables the limit). Resized images are re-encoded as PNG.
pub fn prepare_image(bytes: &[u8], max_dimension: u32) -> Result<PreparedImage, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::UnreadableImage("image is empty".into()));
    }

    let format =
        image::guess_format(bytes).map_err(|e| OcrError::UnreadableImage(e.to_string()))?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| OcrError::UnreadableImage(e.to_string()))?;
    let (width, height) = (img.width(), img.height());

    if max_dimension == 0 || width.max(height) <= max_dimension {
        return Ok(PreparedImage {
            bytes: bytes.to_vec(),
            mime: format.to_mime_type(),
            width,
            height,
        });
    }

    let resized = img.resize(max_dimension, max_dimension, FilterType::Triangle);
    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| OcrError::ImageConversion(e.to_string()))?;

    tracing::debug!(
        from_width = width,
        from_height = height,
        to_width = resized.width(),
        to_height = resized.height(),
        "Downscaled image for OCR"
    );

    Ok(PreparedImage {
        bytes: out.into_inner(),
        mime: ImageFormat::Png.to_mime_type(),
        width: resized.width(),
        height: resized.height(),
    })
}
