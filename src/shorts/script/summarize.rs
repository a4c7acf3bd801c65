use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::json;

use super::{
    CHUNK_CHARS, CHUNK_SUMMARY_CHARS, MAX_SCRIPT_CHARS, MIN_SOURCE_CHARS, Script, char_len,
    truncate_chars,
};
use crate::shorts::error::{ShortsError, ShortsResult};
use crate::shorts::providers::TextGenerator;
use crate::shorts::retry::{RetryPolicy, retry_operation};
use crate::ui::prelude::{Level, emit};

/// Result of reducing source text to a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub script: Script,
    /// Chunks whose summary fell back to their leading raw text.
    pub degraded_chunks: usize,
}

/// Bounded recursive summarizer.
///
/// Text up to [`MAX_SCRIPT_CHARS`] is returned as-is. Longer text is split
/// into [`CHUNK_CHARS`] chunks that are summarized concurrently, joined in
/// chunk order, and given at most one corrective pass. If the corrective pass
/// still overflows, the result is cut at [`MAX_SCRIPT_CHARS`].
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
    language: String,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy, language: impl Into<String>) -> Self {
        Self {
            generator,
            retry,
            language: language.into(),
        }
    }

    pub async fn summarize(&self, text: &str) -> ShortsResult<Summary> {
        let length = char_len(text);
        if length < MIN_SOURCE_CHARS {
            return Err(ShortsError::ExtractionTooShort {
                length,
                minimum: MIN_SOURCE_CHARS,
            });
        }
        if length <= MAX_SCRIPT_CHARS {
            return Ok(Summary {
                script: Script::bounded(text),
                degraded_chunks: 0,
            });
        }

        let chunks = partition_chunks(text, CHUNK_CHARS);
        emit(
            Level::Info,
            "shorts.summarize.chunks",
            &format!("Summarizing {length} characters in {} chunks", chunks.len()),
            Some(json!({ "characters": length, "chunks": chunks.len() })),
        );

        let summaries = join_all(
            chunks
                .iter()
                .enumerate()
                .map(|(index, chunk)| self.summarize_chunk(index, chunk)),
        )
        .await;

        let degraded_chunks = summaries.iter().filter(|unit| unit.degraded).count();
        let joined = summaries
            .into_iter()
            .map(|unit| unit.text)
            .collect::<Vec<_>>()
            .join("\n");

        let script = if char_len(&joined) <= MAX_SCRIPT_CHARS {
            Script::bounded(joined)
        } else {
            self.corrective_pass(&joined).await?
        };

        Ok(Summary {
            script,
            degraded_chunks,
        })
    }

    async fn summarize_chunk(&self, index: usize, chunk: &str) -> SummaryUnit {
        let instruction = chunk_instruction(&self.language);
        let generator = &self.generator;
        let result = retry_operation(&self.retry, "summarize chunk", || {
            generator.complete(&instruction, chunk)
        })
        .await;

        match result {
            Ok(reply) if !reply.trim().is_empty() => SummaryUnit {
                text: truncate_chars(reply.trim(), CHUNK_SUMMARY_CHARS),
                degraded: false,
            },
            outcome => {
                let reason = match outcome {
                    Err(err) => format!("{err:#}"),
                    Ok(_) => "empty reply".to_string(),
                };
                emit(
                    Level::Warn,
                    "shorts.summarize.chunk_degraded",
                    &format!("Chunk {index} fell back to its leading text: {reason}"),
                    Some(json!({ "chunk": index })),
                );
                SummaryUnit {
                    text: truncate_chars(chunk, CHUNK_SUMMARY_CHARS),
                    degraded: true,
                }
            }
        }
    }

    async fn corrective_pass(&self, joined: &str) -> ShortsResult<Script> {
        let instruction = final_instruction(&self.language);
        let generator = &self.generator;
        let reply = retry_operation(&self.retry, "summarize", || {
            generator.complete(&instruction, joined)
        })
        .await
        .map_err(|err| ShortsError::SummarizationFailed(format!("{err:#}")))?;

        let reply = reply.trim();
        let (source, length) = if reply.is_empty() {
            (joined, char_len(joined))
        } else {
            (reply, char_len(reply))
        };

        if length <= MAX_SCRIPT_CHARS {
            return Ok(Script::bounded(source));
        }

        emit(
            Level::Warn,
            "shorts.summarize.truncated",
            &format!("Summary still {length} characters after corrective pass, cutting at {MAX_SCRIPT_CHARS}"),
            Some(json!({ "characters": length })),
        );
        Ok(Script::truncated_from(source))
    }
}

struct SummaryUnit {
    text: String,
    degraded: bool,
}

/// Split `text` into consecutive chunks of `size` characters; the last may be shorter.
pub fn partition_chunks(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn chunk_instruction(language: &str) -> String {
    format!(
        "Summarize the following article in {language} in at most {CHUNK_SUMMARY_CHARS} characters. \
         Keep the key facts and write clearly and concisely."
    )
}

fn final_instruction(language: &str) -> String {
    format!(
        "Summarize the following article in {language} in at most {MAX_SCRIPT_CHARS} characters. \
         Keep the key facts and write clearly and concisely."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies with a closure of the input; records every call.
    struct ScriptedGenerator<F> {
        reply: F,
        calls: Mutex<Vec<String>>,
    }

    impl<F> ScriptedGenerator<F>
    where
        F: Fn(&str, &str) -> Result<String> + Send + Sync,
    {
        fn new(reply: F) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl<F> TextGenerator for ScriptedGenerator<F>
    where
        F: Fn(&str, &str) -> Result<String> + Send + Sync,
    {
        async fn complete(&self, instruction: &str, input: &str) -> Result<String> {
            self.calls.lock().unwrap().push(input.to_string());
            // First chunk finishes last.
            if input.starts_with('A') {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            (self.reply)(instruction, input)
        }
    }

    fn summarizer<G: TextGenerator + 'static>(generator: Arc<G>) -> Summarizer {
        Summarizer::new(generator, RetryPolicy::none(), "Korean")
    }

    fn lettered_source() -> String {
        format!("{}{}{}", "A".repeat(2000), "B".repeat(2000), "C".repeat(500))
    }

    #[test]
    fn partition_4500_characters_into_three_chunks() {
        let chunks = partition_chunks(&lettered_source(), CHUNK_CHARS);
        let lengths: Vec<usize> = chunks.iter().map(|c| char_len(c)).collect();
        assert_eq!(lengths, vec![2000, 2000, 500]);
        assert!(chunks[0].chars().all(|c| c == 'A'));
        assert!(chunks[2].chars().all(|c| c == 'C'));
    }

    #[test]
    fn partition_respects_multibyte_boundaries() {
        let text = "가".repeat(2001);
        let chunks = partition_chunks(&text, CHUNK_CHARS);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "가");
    }

    #[tokio::test]
    async fn short_text_is_rejected() {
        let generator = ScriptedGenerator::new(|_, _| Ok(String::new()));
        let err = summarizer(generator.clone()).summarize("tiny").await.unwrap_err();
        assert!(matches!(
            err,
            ShortsError::ExtractionTooShort { length: 4, minimum: 100 }
        ));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn text_within_limit_is_unchanged() {
        let generator = ScriptedGenerator::new(|_, _| Ok("should not be called".to_string()));
        let text = "기사 본문 ".repeat(300);
        let text = truncate_chars(&text, 2000);

        let summary = summarizer(generator.clone()).summarize(&text).await.unwrap();
        assert_eq!(summary.script.as_str(), text);
        assert!(!summary.script.was_truncated());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn chunk_summaries_join_in_chunk_order() {
        let generator = ScriptedGenerator::new(|_, input| {
            let first = input.chars().next().unwrap_or('?');
            Ok(format!("summary {first}"))
        });

        let summary = summarizer(generator.clone())
            .summarize(&lettered_source())
            .await
            .unwrap();

        assert_eq!(summary.script.as_str(), "summary A\nsummary B\nsummary C");
        assert_eq!(summary.degraded_chunks, 0);
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn failing_chunk_degrades_to_leading_text() {
        let generator = ScriptedGenerator::new(|_, input| {
            if input.starts_with('B') {
                anyhow::bail!("rate limited");
            }
            Ok("ok".to_string())
        });

        let summary = summarizer(generator).summarize(&lettered_source()).await.unwrap();
        let parts: Vec<&str> = summary.script.as_str().split('\n').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ok");
        assert_eq!(parts[1], "B".repeat(1000));
        assert_eq!(parts[2], "ok");
        assert_eq!(summary.degraded_chunks, 1);
    }

    #[tokio::test]
    async fn long_chunk_replies_are_capped() {
        let generator = ScriptedGenerator::new(|_, input| {
            if input.starts_with('y') {
                Ok("x".repeat(1500))
            } else {
                Ok("short".to_string())
            }
        });
        let source = format!("{}{}", "y".repeat(2000), "v".repeat(100));

        let summary = summarizer(generator.clone()).summarize(&source).await.unwrap();
        assert_eq!(
            summary.script.as_str(),
            format!("{}\nshort", "x".repeat(CHUNK_SUMMARY_CHARS))
        );
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn overflow_triggers_one_corrective_pass() {
        let generator = ScriptedGenerator::new(|instruction, _| {
            if instruction.contains("2000") {
                Ok("final summary".to_string())
            } else {
                Ok("z".repeat(1000))
            }
        });
        let source = "w".repeat(6000);

        let summary = summarizer(generator.clone()).summarize(&source).await.unwrap();
        assert_eq!(summary.script.as_str(), "final summary");
        assert!(!summary.script.was_truncated());
        assert_eq!(generator.call_count(), 4);
    }

    #[tokio::test]
    async fn overflowing_twice_truncates_at_limit() {
        let generator = ScriptedGenerator::new(|_, _| Ok("q".repeat(2500)));
        let source = "w".repeat(6000);

        let summary = summarizer(generator.clone()).summarize(&source).await.unwrap();
        assert!(summary.script.was_truncated());
        assert_eq!(summary.script.char_len(), MAX_SCRIPT_CHARS);
        // Three chunks plus exactly one corrective pass.
        assert_eq!(generator.call_count(), 4);
    }

    #[tokio::test]
    async fn failed_corrective_pass_is_fatal() {
        let generator = ScriptedGenerator::new(|instruction, _| {
            if instruction.contains("2000") {
                anyhow::bail!("service unavailable");
            }
            Ok("z".repeat(1000))
        });
        let source = "w".repeat(6000);

        let err = summarizer(generator).summarize(&source).await.unwrap_err();
        match err {
            ShortsError::SummarizationFailed(message) => {
                assert!(message.contains("service unavailable"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
