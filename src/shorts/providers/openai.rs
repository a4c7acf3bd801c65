use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{TextGenerator, Transcriber, ensure_success, require_key};
use crate::shorts::config::ProvidersConfig;
use crate::ui::prelude::{Level, emit};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, empty when the model returned nothing.
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}

/// OpenAI chat completions and audio transcription.
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    chat_model: String,
    transcription_model: String,
    transcription_language: String,
}

impl OpenAiClient {
    pub fn new(client: Client, config: &ProvidersConfig) -> Self {
        Self {
            client,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            transcription_model: config.transcription_model.clone(),
            transcription_language: config.transcription_language.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, instruction: &str, input: &str) -> Result<String> {
        let api_key = require_key(&self.api_key, "OpenAI API key")?;
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content: input,
                },
            ],
        };

        emit(
            Level::Debug,
            "shorts.openai.chat",
            &format!(
                "Requesting completion from {} ({} input characters)",
                self.chat_model,
                input.chars().count()
            ),
            None,
        );

        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await
            .context("Failed to connect to OpenAI chat completions")?;
        let resp = ensure_success(resp, "OpenAI chat").await?;

        let body: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse OpenAI chat response")?;
        Ok(body.into_text())
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, audio: Bytes) -> Result<String> {
        let api_key = require_key(&self.api_key, "OpenAI API key")?;
        let url = format!("{}/audio/transcriptions", self.base_url);

        let part = Part::stream(audio)
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")
            .context("Failed to set audio content type")?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.transcription_model.clone())
            .text("response_format", "srt")
            .text("language", self.transcription_language.clone());

        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .multipart(form)
            .send()
            .await
            .context("Failed to upload audio for transcription")?;
        let resp = ensure_success(resp, "OpenAI transcription").await?;

        resp.text()
            .await
            .context("Failed to read transcription response")
    }
}
