//! Splits OCR output into candidate comments.

/// Splits `text` into trimmed lines, dropping blank lines and lines with fewer than
/// `min_length` characters. When nothing survives, the original text is returned untouched
/// as the single candidate, so the result is never empty.
pub fn segment(text: &str, min_length: usize) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.chars().count() >= min_length)
        .map(str::to_string)
        .collect();

    if lines.is_empty() {
        vec![text.to_string()]
    } else {
        lines
    }
}
