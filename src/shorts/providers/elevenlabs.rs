use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::json;

use super::{SpeechSynthesizer, ensure_success, require_key};
use crate::shorts::config::ProvidersConfig;

const STABILITY: f64 = 0.5;
const SIMILARITY_BOOST: f64 = 0.5;

/// ElevenLabs text-to-speech.
pub struct ElevenLabsClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    voice_id: String,
    model: String,
}

impl ElevenLabsClient {
    pub fn new(client: Client, config: &ProvidersConfig) -> Self {
        Self {
            client,
            api_key: config.elevenlabs_api_key.clone(),
            base_url: config.elevenlabs_base_url.trim_end_matches('/').to_string(),
            voice_id: config.voice_id.clone(),
            model: config.tts_model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Bytes> {
        let api_key = require_key(&self.api_key, "ElevenLabs API key")?;

        let resp = self
            .client
            .post(self.endpoint())
            .header(ACCEPT, "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&json!({
                "text": text,
                "model_id": self.model,
                "voice_settings": {
                    "stability": STABILITY,
                    "similarity_boost": SIMILARITY_BOOST,
                },
            }))
            .send()
            .await
            .context("Failed to connect to ElevenLabs")?;
        let resp = ensure_success(resp, "ElevenLabs").await?;

        let audio = resp
            .bytes()
            .await
            .context("Failed to read synthesized audio")?;
        if audio.is_empty() {
            anyhow::bail!("ElevenLabs returned empty audio");
        }
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_voice() {
        let config = ProvidersConfig {
            elevenlabs_base_url: "https://tts.example/v1/".to_string(),
            ..ProvidersConfig::default()
        };
        let client = ElevenLabsClient::new(Client::new(), &config);
        assert_eq!(
            client.endpoint(),
            "https://tts.example/v1/text-to-speech/4JJwo477JUAx3HV0T7n7"
        );
    }
}
