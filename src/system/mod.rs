//! System interactions (clipboard, OCR)

mod clipboard;
pub(crate) mod ocr;

pub use clipboard::{set_clipboard_text, ClipboardError, ClipboardHold};
pub use ocr::{
    extract_text, prepare_image, HostedOcrEngine, OcrEngine, OcrError, OcrProgress, OcrSession,
    PreparedImage,
};
