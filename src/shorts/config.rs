use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::paths;

/// Root configuration, loaded once at process start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ShortsConfig {
    pub engine: EngineConfig,
    pub frame: FrameConfig,
    pub encoding: EncodingConfig,
    pub script: ScriptConfig,
    pub providers: ProvidersConfig,
    pub retry: RetryConfig,
    pub server: ServerConfig,
}

/// Compositing engine (ffmpeg) configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Binary name or absolute path; bare names are resolved on PATH
    pub ffmpeg: String,
    /// Maximum number of concurrently running engine processes
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// Directory that holds per-job workspaces; defaults to the user cache dir
    pub workspace_root: Option<PathBuf>,
}

/// Output frame geometry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Fixed encoder options appended to every engine invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EncodingConfig {
    pub video_codec: String,
    pub video_bitrate: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScriptConfig {
    /// Language the narration is written in
    pub language: String,
    /// Estimated narration speed, used when the transcript carries no timing
    pub chars_per_second: f64,
    pub min_duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    /// ISO-639-1 code passed to the transcription API
    pub transcription_language: String,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
    pub voice_id: String,
    pub tts_model: String,
    pub unsplash_access_key: Option<String>,
    pub unsplash_base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub body_limit_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            concurrency: 2,
            timeout_secs: 600,
            workspace_root: None,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            video_bitrate: "2000k".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            language: "Korean".to_string(),
            chars_per_second: 7.0,
            min_duration_secs: 5.0,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4".to_string(),
            transcription_model: "whisper-1".to_string(),
            transcription_language: "ko".to_string(),
            elevenlabs_api_key: None,
            elevenlabs_base_url: "https://api.elevenlabs.io/v1".to_string(),
            voice_id: "4JJwo477JUAx3HV0T7n7".to_string(),
            tts_model: "eleven_multilingual_v2".to_string(),
            unsplash_access_key: None,
            unsplash_base_url: "https://api.unsplash.com".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:4000".to_string(),
            body_limit_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ShortsConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_path(config_path()?)
    }

    /// Load configuration from a TOML file, writing defaults if it is missing.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents).context("parsing config")?;
        Ok(config.sanitized())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, toml).with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - OPENAI_API_KEY → providers.openai_api_key
    /// - ELEVENLABS_API_KEY → providers.elevenlabs_api_key
    /// - UNSPLASH_ACCESS_KEY → providers.unsplash_access_key
    /// - AUTOSHORTS_FFMPEG → engine.ffmpeg
    /// - AUTOSHORTS_BIND → server.bind
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = non_empty_env("OPENAI_API_KEY") {
            self.providers.openai_api_key = Some(key);
        }
        if let Some(key) = non_empty_env("ELEVENLABS_API_KEY") {
            self.providers.elevenlabs_api_key = Some(key);
        }
        if let Some(key) = non_empty_env("UNSPLASH_ACCESS_KEY") {
            self.providers.unsplash_access_key = Some(key);
        }
        if let Some(ffmpeg) = non_empty_env("AUTOSHORTS_FFMPEG") {
            self.engine.ffmpeg = ffmpeg;
        }
        if let Some(bind) = non_empty_env("AUTOSHORTS_BIND") {
            self.server.bind = bind;
        }
        self
    }

    /// Replace out-of-range values with their defaults.
    fn sanitized(mut self) -> Self {
        if self.engine.concurrency == 0 {
            self.engine.concurrency = EngineConfig::default().concurrency;
        }
        if self.engine.timeout_secs == 0 {
            self.engine.timeout_secs = EngineConfig::default().timeout_secs;
        }
        if self.frame.width == 0 || self.frame.height == 0 || self.frame.fps == 0 {
            self.frame = FrameConfig::default();
        }
        if !self.script.chars_per_second.is_finite() || self.script.chars_per_second <= 0.0 {
            self.script.chars_per_second = ScriptConfig::default().chars_per_second;
        }
        if !self.script.min_duration_secs.is_finite() || self.script.min_duration_secs <= 0.0 {
            self.script.min_duration_secs = ScriptConfig::default().min_duration_secs;
        }
        if self.retry.attempts == 0 {
            self.retry.attempts = 1;
        }
        self
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.timeout_secs)
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.engine
            .workspace_root
            .clone()
            .unwrap_or_else(paths::default_workspace_root)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

pub fn config_path() -> Result<PathBuf> {
    Ok(paths::autoshorts_config_dir()?.join("config.toml"))
}
