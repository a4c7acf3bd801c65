//! Job state machine: extract, summarize, synthesize, transcribe, assemble,
//! render.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use thiserror::Error;

use super::captions::{self, srt};
use super::config::ScriptConfig;
use super::error::{ShortsError, ShortsResult};
use super::providers::Providers;
use super::render::{AudioTrack, RenderJob, RenderOrchestrator, build_graph};
use super::retry::{RetryPolicy, retry_operation};
use super::script::extract::extract_article_text;
use super::script::keyword::extract_keyword;
use super::script::narration::write_narration;
use super::script::summarize::Summarizer;
use super::script::{MAX_SCRIPT_CHARS, Script, char_len};
use super::slides::SlideSetBuilder;
use crate::ui::prelude::{Level, emit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Extracting,
    Summarizing,
    Synthesizing,
    Transcribing,
    AssemblingSlides,
    AssemblingCaptions,
    BuildingGraph,
    Rendering,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Extracting => "extracting",
            Stage::Summarizing => "summarizing",
            Stage::Synthesizing => "synthesizing",
            Stage::Transcribing => "transcribing",
            Stage::AssemblingSlides => "assembling_slides",
            Stage::AssemblingCaptions => "assembling_captions",
            Stage::BuildingGraph => "building_graph",
            Stage::Rendering => "rendering",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the narration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    /// Article to fetch, summarize and rewrite.
    Url(String),
    /// Narration supplied directly; only bounded, never rewritten.
    Script(String),
}

#[derive(Debug, Clone)]
pub struct JobRequest {
    pub source: JobSource,
    pub title: String,
    pub images: Vec<Bytes>,
}

impl JobRequest {
    pub fn validate(&self) -> ShortsResult<()> {
        if self.title.trim().is_empty() {
            return Err(ShortsError::InvalidRequest("A title is required.".to_string()));
        }
        match &self.source {
            JobSource::Url(url) if url.trim().is_empty() => Err(ShortsError::InvalidRequest(
                "An article URL or a script is required.".to_string(),
            )),
            JobSource::Script(text) if text.trim().is_empty() => Err(ShortsError::InvalidRequest(
                "An article URL or a script is required.".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// A finished job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub job_id: String,
    pub video: Vec<u8>,
    pub script: String,
    /// Body captions as SRT.
    pub captions: String,
    pub title: String,
}

/// A failed job and the stage it failed in.
#[derive(Debug, Error)]
#[error("job failed while {stage}: {error}")]
pub struct JobFailure {
    pub stage: Stage,
    #[source]
    pub error: ShortsError,
}

impl JobFailure {
    pub fn user_message(&self) -> String {
        self.error.user_message()
    }
}

/// `job_<unix millis>_<random>`
pub fn generate_job_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let random: u32 = rand::random();

    format!("job_{}_{:08x}", timestamp, random)
}

/// Seconds of narration: the end of the last transcribed cue, or a
/// speaking-rate estimate from the script when the transcript has no timing.
pub fn estimate_duration(transcript: &str, script: &Script, config: &ScriptConfig) -> f64 {
    let from_cues = srt::parse_srt(transcript)
        .ok()
        .and_then(|cues| cues.iter().map(|cue| cue.end).max())
        .map(|end| end.as_secs_f64())
        .filter(|seconds| *seconds > 0.0);

    from_cues.unwrap_or_else(|| {
        let estimate = script.char_len() as f64 / config.chars_per_second;
        estimate.max(config.min_duration_secs)
    })
}

pub struct Pipeline {
    providers: Providers,
    orchestrator: Arc<RenderOrchestrator>,
    retry: RetryPolicy,
    script: ScriptConfig,
}

struct Progress<'a> {
    job_id: &'a str,
    stage: Stage,
    observer: &'a mut (dyn FnMut(Stage) + Send),
}

impl Progress<'_> {
    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        emit(
            Level::Info,
            "shorts.pipeline.stage",
            &format!("[{}] {}", self.job_id, stage),
            Some(json!({ "job": self.job_id, "stage": stage.as_str() })),
        );
        (self.observer)(stage);
    }
}

impl Pipeline {
    pub fn new(
        providers: Providers,
        orchestrator: Arc<RenderOrchestrator>,
        retry: RetryPolicy,
        script: ScriptConfig,
    ) -> Self {
        Self {
            providers,
            orchestrator,
            retry,
            script,
        }
    }

    pub async fn run(&self, request: JobRequest) -> Result<JobOutput, JobFailure> {
        self.run_observed(request, &mut |_| {}).await
    }

    /// Run a job, reporting every stage transition to `observer`.
    pub async fn run_observed(
        &self,
        request: JobRequest,
        observer: &mut (dyn FnMut(Stage) + Send),
    ) -> Result<JobOutput, JobFailure> {
        let job_id = generate_job_id();
        let mut progress = Progress {
            job_id: &job_id,
            stage: Stage::Idle,
            observer,
        };

        let result = match request.validate() {
            Ok(()) => self.execute(&job_id, request, &mut progress).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(output) => {
                progress.enter(Stage::Done);
                Ok(output)
            }
            Err(error) => {
                let stage = progress.stage;
                emit(
                    Level::Error,
                    "shorts.pipeline.failed",
                    &format!("[{job_id}] failed while {stage}: {error}"),
                    Some(json!({
                        "job": job_id,
                        "stage": stage.as_str(),
                        "kind": error.kind(),
                    })),
                );
                if let ShortsError::RenderEngineFailed { diagnostics, .. } = &error {
                    emit(
                        Level::Debug,
                        "shorts.pipeline.engine_diagnostics",
                        diagnostics,
                        Some(json!({ "job": job_id })),
                    );
                }
                progress.enter(Stage::Failed);
                Err(JobFailure { stage, error })
            }
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        request: JobRequest,
        progress: &mut Progress<'_>,
    ) -> ShortsResult<JobOutput> {
        let JobRequest {
            source,
            title,
            images,
        } = request;
        let title = title.trim().to_string();

        progress.enter(Stage::Extracting);
        let source = match source {
            JobSource::Url(url) => {
                let fetcher = &self.providers.fetcher;
                let html = retry_operation(&self.retry, "fetch article", || fetcher.fetch_html(&url))
                    .await
                    .map_err(|err| ShortsError::ExtractionFailed(format!("{err:#}")))?;
                JobSource::Url(extract_article_text(&html)?)
            }
            JobSource::Script(text) => JobSource::Script(text.trim().to_string()),
        };

        progress.enter(Stage::Summarizing);
        let script = self.write_script(source).await?;

        progress.enter(Stage::Synthesizing);
        let speech = &self.providers.speech;
        let audio = retry_operation(&self.retry, "synthesize speech", || {
            speech.synthesize(script.as_str())
        })
        .await
        .map_err(|err| ShortsError::SpeechSynthesisFailed(format!("{err:#}")))?;

        progress.enter(Stage::Transcribing);
        let transcriber = &self.providers.transcriber;
        let transcript = retry_operation(&self.retry, "transcribe", || {
            transcriber.transcribe(audio.clone())
        })
        .await
        .map_err(|err| ShortsError::TranscriptionFailed(format!("{err:#}")))?;
        let duration = estimate_duration(&transcript, &script, &self.script);

        progress.enter(Stage::AssemblingSlides);
        let keyword = extract_keyword(script.as_str());
        emit(
            Level::Debug,
            "shorts.pipeline.keyword",
            &format!("[{job_id}] image keyword '{keyword}', {duration:.1}s of narration"),
            None,
        );
        let slides = SlideSetBuilder::new(self.providers.images.clone(), self.retry)
            .build(images, &keyword, duration)
            .await?;

        progress.enter(Stage::AssemblingCaptions);
        let captions = captions::build_captions(&transcript, &title)?;

        progress.enter(Stage::BuildingGraph);
        let audio = AudioTrack::new(audio, duration);
        let graph = build_graph(&slides, &audio, &captions, self.orchestrator.frame())?;

        progress.enter(Stage::Rendering);
        let job = RenderJob {
            id: job_id.to_string(),
            slides,
            audio,
            captions,
            graph,
        };
        let video = self.orchestrator.render(&job).await?;

        Ok(JobOutput {
            job_id: job_id.to_string(),
            video,
            script: script.into_string(),
            captions: job.captions.body.to_srt(),
            title,
        })
    }

    async fn write_script(&self, source: JobSource) -> ShortsResult<Script> {
        let summarizer = Summarizer::new(
            self.providers.text.clone(),
            self.retry,
            self.script.language.clone(),
        );

        match source {
            JobSource::Url(article) => {
                let summary = summarizer.summarize(&article).await?;
                if summary.degraded_chunks > 0 {
                    emit(
                        Level::Warn,
                        "shorts.pipeline.degraded_summary",
                        &format!(
                            "{} chunk(s) used raw text instead of a summary",
                            summary.degraded_chunks
                        ),
                        None,
                    );
                }
                write_narration(
                    self.providers.text.as_ref(),
                    &self.retry,
                    summary.script.as_str(),
                    &self.script.language,
                )
                .await
            }
            JobSource::Script(text) if char_len(&text) > MAX_SCRIPT_CHARS => {
                Ok(summarizer.summarize(&text).await?.script)
            }
            JobSource::Script(text) => Ok(Script::bounded(text)),
        }
    }
}
