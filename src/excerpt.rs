//! Excerpt truncation
//!
//! Excerpts are cut at the most natural boundary that fits the bound:
//!
//! 1. Text within the bound is returned unchanged.
//! 2. Otherwise cut after the last `.` that fits.
//! 3. Otherwise cut at the last space and append `…`.
//! 4. Otherwise hard-truncate and append `…`.
//!
//! Lengths are counted in characters, and the result never exceeds the
//! bound, ellipsis included.

/// Marker appended to truncated excerpts
pub const ELLIPSIS: char = '…';

/// Truncate `text` to at most `max_chars` characters
///
/// # Examples
///
/// ```rust
/// use markdown_ingest::excerpt::truncate_excerpt;
///
/// assert_eq!(truncate_excerpt("Short.", 20), "Short.");
/// assert_eq!(truncate_excerpt("One. Two three four", 12), "One.");
/// assert_eq!(truncate_excerpt("alpha beta gamma", 12), "alpha beta…");
/// assert_eq!(truncate_excerpt("abcdefghij", 5), "abcd…");
/// ```
pub fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let window = prefix(text, max_chars);
    if let Some(pos) = window.rfind('.') {
        return window[..=pos].to_string();
    }

    let window = prefix(text, max_chars - 1);
    if let Some(pos) = window.rfind(' ') {
        let cut = window[..pos].trim_end();
        if !cut.is_empty() {
            return format!("{cut}{ELLIPSIS}");
        }
    }

    format!("{window}{ELLIPSIS}")
}

/// Truncate text known to continue past its end
///
/// Text longer than the bound is cut as [`truncate_excerpt`] cuts it. Shorter
/// text drops its last, possibly partial, word and always gains `…`.
///
/// # Examples
///
/// ```rust
/// use markdown_ingest::excerpt::truncate_partial_excerpt;
///
/// assert_eq!(truncate_partial_excerpt("alpha be", 20), "alpha…");
/// assert_eq!(truncate_partial_excerpt("alph", 20), "alph…");
/// ```
pub fn truncate_partial_excerpt(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if text.chars().count() > max_chars {
        return truncate_excerpt(text, max_chars);
    }

    let window = prefix(text, max_chars - 1).trim_end();
    let kept = match window.rfind(' ') {
        Some(pos) if !window[..pos].trim_end().is_empty() => window[..pos].trim_end(),
        _ => window,
    };
    format!("{kept}{ELLIPSIS}")
}

/// The first `n` characters of `text`
fn prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
