//! Plain-text normalization for feed titles and bodies.

use once_cell::sync::Lazy;
use regex::Regex;

/// Summary length used when none is specified.
pub const DEFAULT_SUMMARY_LENGTH: usize = 200;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
// A tag opened at the end of the text and never closed, e.g. a feed body cut
// off mid-markup.
static OPEN_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[A-Za-z/!?][^>]*$").unwrap());

fn is_kept(c: char) -> bool {
    c.is_alphanumeric()
        || c.is_whitespace()
        || matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | '-' | '&')
}

/// Turn raw feed text into a single line of plain text.
///
/// Entities are decoded before tags are removed, so escaped markup such as
/// `&lt;b&gt;` is stripped too. Characters outside letters, digits,
/// whitespace and basic punctuation are dropped.
pub fn clean(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let decoded = html_escape::decode_html_entities(text);
    let without_tags = TAG_RE.replace_all(&decoded, "");
    let without_tags = OPEN_TAG_RE.replace(&without_tags, "");

    let filtered: String = without_tags.chars().filter(|&c| is_kept(c)).collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean `text` and shorten it to roughly `max_length` characters, preferring
/// to cut at a sentence end, then at a word boundary.
pub fn summarize(text: &str, max_length: usize) -> String {
    let cleaned = clean(Some(text));
    let chars: Vec<char> = cleaned.chars().collect();
    if chars.len() <= max_length {
        return cleaned;
    }

    let head = &chars[..max_length];

    if let Some(end) = head
        .iter()
        .rposition(|c| matches!(c, '.' | '?' | '!'))
        .filter(|&pos| pos > 0)
    {
        return head[..=end].iter().collect();
    }

    if let Some(space) = head.iter().rposition(|&c| c == ' ').filter(|&pos| pos > 0) {
        let mut out: String = head[..space].iter().collect();
        out.push_str("...");
        return out;
    }

    let mut out: String = head.iter().collect();
    out.push_str("...");
    out
}
