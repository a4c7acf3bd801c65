//! External collaborators of a shorts job.
//!
//! Each provider is one request/response call behind an async trait so the
//! pipeline can be driven by stubs in tests. The HTTP implementations live in
//! the submodules.

pub mod article;
pub mod elevenlabs;
pub mod openai;
pub mod unsplash;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

use super::config::ProvidersConfig;

/// Fetches the raw HTML of an article.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Chat-style text generation: one system instruction, one user message.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, instruction: &str, input: &str) -> Result<String>;
}

/// Text-to-speech. Returns encoded audio (mp3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Bytes>;
}

/// Speech-to-text. Returns an SRT document.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Bytes) -> Result<String>;
}

/// Keyword image search returning up to `count` downloaded images.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, keyword: &str, count: usize) -> Result<Vec<Bytes>>;
}

/// The full set of collaborators a pipeline needs.
#[derive(Clone)]
pub struct Providers {
    pub fetcher: Arc<dyn ArticleFetcher>,
    pub text: Arc<dyn TextGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub images: Arc<dyn ImageSearch>,
}

impl Providers {
    /// Build the HTTP-backed providers from configuration.
    ///
    /// Missing API keys are not an error here; the affected call fails when
    /// it is first made.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let client = build_client(config)?;

        let openai = Arc::new(openai::OpenAiClient::new(client.clone(), config));
        Ok(Self {
            fetcher: Arc::new(article::HttpArticleFetcher::new(client.clone())),
            text: openai.clone(),
            speech: Arc::new(elevenlabs::ElevenLabsClient::new(client.clone(), config)),
            transcriber: openai,
            images: Arc::new(unsplash::UnsplashClient::new(client, config)),
        })
    }
}

fn build_client(config: &ProvidersConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
        .user_agent(concat!("autoshorts/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn require_key<'a>(key: &'a Option<String>, name: &str) -> Result<&'a str> {
    key.as_deref()
        .filter(|value| !value.is_empty())
        .with_context(|| format!("{name} is not configured"))
}

/// Fail with the response body attached when the status is not 2xx.
pub(crate) async fn ensure_success(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    anyhow::bail!("{what} API error ({status}): {}", text.trim())
}
