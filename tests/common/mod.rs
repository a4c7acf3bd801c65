#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use autoshorts::shorts::ShortsResult;
use autoshorts::shorts::config::ScriptConfig;
use autoshorts::shorts::error::ShortsError;
use autoshorts::shorts::pipeline::Pipeline;
use autoshorts::shorts::providers::{
    ArticleFetcher, ImageSearch, Providers, SpeechSynthesizer, TextGenerator, Transcriber,
};
use autoshorts::shorts::render::{EngineRunner, RenderOrchestrator};
use autoshorts::shorts::retry::RetryPolicy;
use bytes::Bytes;
use tempfile::TempDir;

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";
pub const NARRATION: &str = "인공지능이 뉴스를 요약합니다. 오늘의 핵심 소식을 전해드립니다.";
pub const TRANSCRIPT: &str = "1\n00:00:00,000 --> 00:00:03,500\n인공지능이 뉴스를 요약합니다.\n\n2\n00:00:03,500 --> 00:00:09,000\n오늘의 핵심 소식을 전해드립니다.\n";

/// A scratch directory used as the render workspace root.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Number of workspaces still present under the root.
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.workspace_root())
            .map(|dir| dir.count())
            .unwrap_or(0)
    }
}

pub struct StubFetcher;

#[async_trait]
impl ArticleFetcher for StubFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        if url.contains("missing") {
            bail!("article API error (404 Not Found): gone");
        }
        let paragraph = "<p>정부는 오늘 인공지능 산업 육성 계획을 발표했다. 이번 계획에는 연구 개발 지원과 인재 양성이 포함된다.</p>";
        Ok(format!(
            "<html><head><script>var x = 1;</script></head><body>{}</body></html>",
            paragraph.repeat(4)
        ))
    }
}

/// Answers every prompt with the same narration and counts calls.
#[derive(Default)]
pub struct StubWriter {
    pub calls: AtomicUsize,
}

impl StubWriter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubWriter {
    async fn complete(&self, _instruction: &str, _input: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(NARRATION.to_string())
    }
}

pub struct StubVoice {
    pub fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for StubVoice {
    async fn synthesize(&self, text: &str) -> Result<Bytes> {
        if self.fail {
            bail!("text-to-speech API error (401 Unauthorized): invalid key");
        }
        Ok(Bytes::from(format!("ID3{text}")))
    }
}

pub struct StubTranscriber;

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio: Bytes) -> Result<String> {
        Ok(TRANSCRIPT.to_string())
    }
}

#[derive(Default)]
pub struct StubImages {
    pub requests: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl ImageSearch for StubImages {
    async fn search(&self, keyword: &str, count: usize) -> Result<Vec<Bytes>> {
        self.requests
            .lock()
            .unwrap()
            .push((keyword.to_string(), count));
        Ok(vec![Bytes::from_static(PNG); count])
    }
}

/// Stands in for ffmpeg: checks that inputs were staged and writes the
/// output file named by the last argument.
#[derive(Default)]
pub struct StubEngine {
    pub fail: bool,
    pub commands: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl EngineRunner for StubEngine {
    async fn run(&self, args: &[String]) -> ShortsResult<()> {
        self.commands.lock().unwrap().push(args.to_vec());
        if self.fail {
            return Err(ShortsError::RenderEngineFailed {
                status: Some(1),
                diagnostics: "Invalid data found when processing input".to_string(),
            });
        }
        for pair in args.windows(2) {
            if pair[0] == "-i" {
                assert!(Path::new(&pair[1]).is_file(), "input not staged: {}", pair[1]);
            }
        }
        let output = args.last().expect("output path");
        std::fs::write(output, b"\0\0\0\x18ftypmp42").expect("write output");
        Ok(())
    }
}

pub struct Harness {
    pub env: TestEnvironment,
    pub writer: Arc<StubWriter>,
    pub images: Arc<StubImages>,
    pub engine: Arc<StubEngine>,
    pub pipeline: Pipeline,
}

#[derive(Default)]
pub struct HarnessOptions {
    pub speech_fails: bool,
    pub engine_fails: bool,
}

pub fn harness(options: HarnessOptions) -> Result<Harness> {
    let env = TestEnvironment::new()?;
    let writer = Arc::new(StubWriter::default());
    let images = Arc::new(StubImages::default());
    let engine = Arc::new(StubEngine {
        fail: options.engine_fails,
        ..StubEngine::default()
    });

    let providers = Providers {
        fetcher: Arc::new(StubFetcher),
        text: writer.clone(),
        speech: Arc::new(StubVoice {
            fail: options.speech_fails,
        }),
        transcriber: Arc::new(StubTranscriber),
        images: images.clone(),
    };
    let orchestrator = Arc::new(RenderOrchestrator::new(
        engine.clone(),
        2,
        Duration::from_secs(10),
        env.workspace_root().to_path_buf(),
    ));
    let pipeline = Pipeline::new(
        providers,
        orchestrator,
        RetryPolicy::none(),
        ScriptConfig::default(),
    );

    Ok(Harness {
        env,
        writer,
        images,
        engine,
        pipeline,
    })
}
