//! Clipboard writing utilities

#[cfg(target_os = "linux")]
mod linux;

use std::time::Instant;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(#[source] arboard::Error),
    #[error("Failed to write clipboard: {0}")]
    Write(#[source] arboard::Error),
}

/// Ownership of freshly written clipboard contents.
/// On Linux the contents vanish with their owner, so this process keeps serving them until the
/// hold is released; dropping it hands them to a clipboard manager if one is running.
/// On macOS and Windows the OS keeps the contents and the hold is inert.
pub struct ClipboardHold {
    clipboard: arboard::Clipboard,
}

impl ClipboardHold {
    /// Blocks the calling thread until `deadline`, then releases the contents.
    pub fn release_at(self, deadline: Instant) {
        std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
        drop(self.clipboard);
        debug!("Clipboard hold released");
    }
}

/// Writes `text` to the system clipboard and returns as soon as it is there.
/// Logs only the length, never the contents.
pub fn set_clipboard_text(text: &str) -> Result<ClipboardHold, ClipboardError> {
    let mut clipboard = arboard::Clipboard::new().map_err(ClipboardError::Unavailable)?;

    #[cfg(target_os = "linux")]
    linux::set_clipboard_text_linux(&mut clipboard, text)?;

    #[cfg(not(target_os = "linux"))]
    {
        clipboard
            .set_text(text.to_string())
            .map_err(ClipboardError::Write)?;
        debug!(len = text.len(), "Wrote text to clipboard");
    }

    Ok(ClipboardHold { clipboard })
}
