use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy for a shorts job.
///
/// Provider plumbing uses `anyhow` internally; each stage boundary maps its
/// failure into one of these variants, keeping the `anyhow` chain as text.
#[derive(Error, Debug)]
pub enum ShortsError {
    #[error("Article extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Source text too short ({length} characters, need at least {minimum})")]
    ExtractionTooShort { length: usize, minimum: usize },

    #[error("Summarization failed: {0}")]
    SummarizationFailed(String),

    #[error("Speech synthesis failed: {0}")]
    SpeechSynthesisFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Image search failed: {0}")]
    ImageSearchFailed(String),

    #[error("Invalid render graph: {0}")]
    InvalidGraph(String),

    #[error("Render engine exited with status {status:?}")]
    RenderEngineFailed {
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("Render engine did not finish within {0:?}")]
    RenderTimeout(Duration),

    #[error("Workspace I/O failed: {message}")]
    WorkspaceIOFailed {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type ShortsResult<T> = std::result::Result<T, ShortsError>;

impl ShortsError {
    pub fn workspace(message: impl Into<String>, source: std::io::Error) -> Self {
        ShortsError::WorkspaceIOFailed {
            message: message.into(),
            source,
        }
    }

    /// Short, stable identifier used in log event codes and JSON payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ShortsError::ExtractionFailed(_) => "extraction_failed",
            ShortsError::ExtractionTooShort { .. } => "extraction_too_short",
            ShortsError::SummarizationFailed(_) => "summarization_failed",
            ShortsError::SpeechSynthesisFailed(_) => "speech_synthesis_failed",
            ShortsError::TranscriptionFailed(_) => "transcription_failed",
            ShortsError::ImageSearchFailed(_) => "image_search_failed",
            ShortsError::InvalidGraph(_) => "invalid_graph",
            ShortsError::RenderEngineFailed { .. } => "render_engine_failed",
            ShortsError::RenderTimeout(_) => "render_timeout",
            ShortsError::WorkspaceIOFailed { .. } => "workspace_io_failed",
            ShortsError::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Engine diagnostics and provider response bodies stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ShortsError::ExtractionFailed(_) | ShortsError::ExtractionTooShort { .. } => {
                "Could not extract the article text.".to_string()
            }
            ShortsError::SummarizationFailed(_) => "Could not summarize the article.".to_string(),
            ShortsError::SpeechSynthesisFailed(_) => "Could not generate the narration audio.".to_string(),
            ShortsError::TranscriptionFailed(_) => "Could not generate subtitles.".to_string(),
            ShortsError::ImageSearchFailed(_) => "Could not find images for the video.".to_string(),
            ShortsError::InvalidGraph(_)
            | ShortsError::RenderEngineFailed { .. }
            | ShortsError::WorkspaceIOFailed { .. } => "Video rendering failed.".to_string(),
            ShortsError::RenderTimeout(_) => "Video rendering timed out.".to_string(),
            ShortsError::InvalidRequest(message) => message.clone(),
        }
    }
}
