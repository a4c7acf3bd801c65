use std::sync::LazyLock;

use regex::Regex;

use super::{MIN_SOURCE_CHARS, char_len};
use crate::shorts::error::{ShortsError, ShortsResult};

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduce an HTML page to its visible text on a single line.
pub fn strip_html(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = TAG.replace_all(&text, " ");
    let text = decode_common_entities(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn decode_common_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Strip `html` and reject pages without enough text to summarize.
pub fn extract_article_text(html: &str) -> ShortsResult<String> {
    let text = strip_html(html);
    let length = char_len(&text);
    if length < MIN_SOURCE_CHARS {
        return Err(ShortsError::ExtractionFailed(format!(
            "only {length} characters of text found, need at least {MIN_SOURCE_CHARS}"
        )));
    }
    Ok(text)
}
