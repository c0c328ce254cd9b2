//! Extraction of the first fenced code block from model output.
//!
//! Models wrap the patch in triple-backtick fences, usually with prose around
//! it and sometimes a language tag on the opening fence. Only the first
//! complete block counts; anything after it is ignored.

use regex::Regex;
use std::sync::OnceLock;

static FENCE: OnceLock<Regex> = OnceLock::new();

fn fence_re() -> &'static Regex {
    FENCE.get_or_init(|| Regex::new(r"(?s)```(.*?)```").expect("fence pattern is valid"))
}

/// Return the trimmed contents of the first complete ``` fenced block.
///
/// `None` when the text has no markers or only an unclosed opening marker.
/// Absence is a normal outcome, not an error.
pub fn extract_patch(text: &str) -> Option<String> {
    let captures = fence_re().captures(text)?;
    let inner = captures.get(1).map(|m| m.as_str()).unwrap_or("");
    Some(strip_language_tag(inner).trim().to_string())
}

/// Drop a language tag (e.g. ```` ```pd ````) from the first fence line.
///
/// Only a short, bare alphanumeric word followed by a newline is treated as a
/// tag; patch content itself always starts with `#`, so real declarations are
/// never stripped.
fn strip_language_tag(inner: &str) -> &str {
    let Some((first, rest)) = inner.split_once('\n') else {
        return inner;
    };
    let tag = first.trim();
    let looks_like_tag = !tag.is_empty()
        && tag.len() <= 16
        && tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-');
    if looks_like_tag {
        rest
    } else {
        inner
    }
}
