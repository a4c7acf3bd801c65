use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::Semaphore;

use super::compiler::{StagedInputs, compile_command};
use super::graph::CaptionFiles;
use super::services::EngineRunner;
use super::workspace::Workspace;
use super::RenderJob;
use crate::shorts::config::{EncodingConfig, FrameConfig, ShortsConfig};
use crate::shorts::error::{ShortsError, ShortsResult};
use crate::ui::prelude::{Level, emit};

const AUDIO_FILE: &str = "narration.mp3";
const TITLE_FILE: &str = "title.srt";
const BODY_FILE: &str = "body.srt";
const OUTPUT_FILE: &str = "output.mp4";

/// Drives the engine for one job at a time per permit.
///
/// Every render runs in its own [`Workspace`], which is removed before
/// `render` returns whatever the outcome.
pub struct RenderOrchestrator {
    runner: Arc<dyn EngineRunner>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    workspace_root: PathBuf,
    frame: FrameConfig,
    encoding: EncodingConfig,
}

impl RenderOrchestrator {
    pub fn new(
        runner: Arc<dyn EngineRunner>,
        concurrency: usize,
        timeout: Duration,
        workspace_root: PathBuf,
    ) -> Self {
        Self {
            runner,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            timeout,
            workspace_root,
            frame: FrameConfig::default(),
            encoding: EncodingConfig::default(),
        }
    }

    pub fn from_config(runner: Arc<dyn EngineRunner>, config: &ShortsConfig) -> Self {
        Self::new(
            runner,
            config.engine.concurrency,
            config.engine_timeout(),
            config.workspace_root(),
        )
        .with_output(config.frame, config.encoding.clone())
    }

    pub fn with_output(mut self, frame: FrameConfig, encoding: EncodingConfig) -> Self {
        self.frame = frame;
        self.encoding = encoding;
        self
    }

    pub fn frame(&self) -> &FrameConfig {
        &self.frame
    }

    pub async fn render(&self, job: &RenderJob) -> ShortsResult<Vec<u8>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ShortsError::RenderEngineFailed {
                status: None,
                diagnostics: "render queue is closed".to_string(),
            })?;

        let workspace = Workspace::create(&self.workspace_root, &job.id)?;
        let workspace_path = workspace.path().to_path_buf();
        let result = self.render_in(&workspace, job).await;

        match workspace.close() {
            Ok(()) => emit(
                Level::Debug,
                "shorts.render.cleanup",
                &format!("Removed workspace {}", workspace_path.display()),
                None,
            ),
            Err(err) => emit(
                Level::Warn,
                "shorts.render.cleanup_failed",
                &format!(
                    "Failed to remove workspace {}: {err}",
                    workspace_path.display()
                ),
                Some(json!({ "job": job.id })),
            ),
        }

        result
    }

    async fn render_in(&self, workspace: &Workspace, job: &RenderJob) -> ShortsResult<Vec<u8>> {
        let staged = stage_inputs(workspace, job).await?;
        let command = compile_command(&job.graph, &staged, &self.frame, &self.encoding)?;

        emit(
            Level::Info,
            "shorts.render.execute",
            &format!("Rendering {} slides for {}", job.slides.len(), job.id),
            Some(json!({ "job": job.id, "slides": job.slides.len() })),
        );

        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.runner.run(&command.args)).await {
            Ok(result) => result?,
            Err(_) => return Err(ShortsError::RenderTimeout(self.timeout)),
        }

        let video = workspace.read(OUTPUT_FILE).await?;
        emit(
            Level::Success,
            "shorts.render.done",
            &format!(
                "Rendered {} bytes in {:.1}s",
                video.len(),
                started.elapsed().as_secs_f64()
            ),
            Some(json!({ "job": job.id, "bytes": video.len() })),
        );
        Ok(video)
    }
}

async fn stage_inputs(workspace: &Workspace, job: &RenderJob) -> ShortsResult<StagedInputs> {
    let mut slides = Vec::with_capacity(job.slides.len());
    for (index, slide) in job.slides.iter().enumerate() {
        let name = format!("slide_{index}.{}", slide.image.format.extension());
        slides.push(workspace.write(&name, &slide.image.data).await?);
    }

    let audio = workspace.write(AUDIO_FILE, &job.audio.data).await?;
    let title = workspace
        .write(TITLE_FILE, job.captions.title.to_srt().as_bytes())
        .await?;
    let body = workspace
        .write(BODY_FILE, job.captions.body.to_srt().as_bytes())
        .await?;

    Ok(StagedInputs {
        slides,
        audio,
        captions: CaptionFiles { title, body },
        output: workspace.file(OUTPUT_FILE),
    })
}
