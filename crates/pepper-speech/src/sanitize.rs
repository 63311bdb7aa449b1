//! Speech-safe text normalization.

/// Characters that only make sense as markup and must never reach the sink.
const MARKUP_CHARS: [char; 3] = ['*', '#', '`'];

/// Normalizes arbitrary text into speech-safe text.
///
/// Markup characters are removed first, then paragraph breaks and finally
/// single line breaks become sentence separators. The result contains no
/// newline characters, so applying this twice is the same as applying it once.
pub fn sanitize(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !MARKUP_CHARS.contains(c)).collect();
    stripped.replace("\n\n", ". ").replace('\n', ". ")
}

/// Returns at most the first `max_chars` characters of `text`, for log lines.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
