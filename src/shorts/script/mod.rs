pub mod extract;
pub mod keyword;
pub mod narration;
pub mod summarize;

/// Maximum length of a script, in characters.
pub const MAX_SCRIPT_CHARS: usize = 2000;
/// Size of one summarization chunk, in characters.
pub const CHUNK_CHARS: usize = 2000;
/// Maximum length of one chunk summary, in characters.
pub const CHUNK_SUMMARY_CHARS: usize = 1000;
/// Source text shorter than this is not worth summarizing.
pub const MIN_SOURCE_CHARS: usize = 100;

/// Narration text handed to speech synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    text: String,
    truncated: bool,
}

impl Script {
    /// Wrap `text`, cutting it to [`MAX_SCRIPT_CHARS`] if needed.
    pub fn bounded(text: impl Into<String>) -> Self {
        let text = text.into();
        if char_len(&text) <= MAX_SCRIPT_CHARS {
            return Self {
                text,
                truncated: false,
            };
        }
        Self {
            text: truncate_chars(&text, MAX_SCRIPT_CHARS),
            truncated: true,
        }
    }

    pub(crate) fn truncated_from(text: &str) -> Self {
        Self {
            text: truncate_chars(text, MAX_SCRIPT_CHARS),
            truncated: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Whether the hard cutoff was applied to produce this script.
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
