//! Text helpers shared by the renderers.

/// Escape text for Telegram HTML markup (`&`, `<`, `>`, `"`).
///
/// # Examples
///
/// ```
/// use hearing_guide_bot::utils::escape_html;
/// assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
/// ```
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

/// Truncate a string to `max_chars` characters.
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use hearing_guide_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Truncate to `max_chars` and append `...` when something was cut.
#[must_use]
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", truncate_str(s, max_chars))
    } else {
        s.to_string()
    }
}
