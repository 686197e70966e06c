//! Linux-specific clipboard implementation

use arboard::{Clipboard, LinuxClipboardKind, SetExtLinux};
use tracing::info;

use super::ClipboardError;

/// Sets the regular (Ctrl+V) clipboard, not PRIMARY.
/// X11 and Wayland clipboards vanish with their owner: the contents are served only while
/// `clipboard` is alive.
pub(super) fn set_clipboard_text_linux(
    clipboard: &mut Clipboard,
    text: &str,
) -> Result<(), ClipboardError> {
    info!(len = text.len(), "Writing text to clipboard");

    clipboard
        .set()
        .clipboard(LinuxClipboardKind::Clipboard)
        .text(text.to_string())
        .map_err(ClipboardError::Write)
}
