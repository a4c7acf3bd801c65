use serde_json::json;

use super::{MAX_SCRIPT_CHARS, Script, char_len};
use crate::shorts::error::{ShortsError, ShortsResult};
use crate::shorts::providers::TextGenerator;
use crate::shorts::retry::{RetryPolicy, retry_operation};
use crate::ui::prelude::{Level, emit};

fn narration_instruction(language: &str) -> String {
    format!(
        "Rewrite the following news article as a 60-second YouTube Shorts script in {language}. \
         Use a casual, clear tone. Write 8 to 10 short, punchy sentences that can each be spoken \
         in under 5 seconds, one sentence per line. Do not number the lines or add any markup; \
         write plain text only, flowing naturally like a real news read."
    )
}

/// Turn an article summary into short-form narration.
pub async fn write_narration(
    generator: &dyn TextGenerator,
    retry: &RetryPolicy,
    article: &str,
    language: &str,
) -> ShortsResult<Script> {
    let instruction = narration_instruction(language);
    let reply = retry_operation(retry, "write narration", || {
        generator.complete(&instruction, article)
    })
    .await
    .map_err(|err| ShortsError::SummarizationFailed(format!("{err:#}")))?;

    let narration = normalize_lines(&reply);
    if narration.is_empty() {
        return Err(ShortsError::SummarizationFailed(
            "text generator returned an empty script".to_string(),
        ));
    }

    let script = Script::bounded(narration);
    if script.was_truncated() {
        emit(
            Level::Warn,
            "shorts.narration.truncated",
            &format!(
                "Narration exceeded {MAX_SCRIPT_CHARS} characters and was cut ({} characters)",
                char_len(&reply)
            ),
            Some(json!({ "characters": char_len(&reply) })),
        );
    }
    Ok(script)
}

/// Trim each line and drop blank ones; one sentence per line survives.
fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
