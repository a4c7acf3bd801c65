use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use serde_json::json;

use super::captions::{self, Captions};
use super::cli::{CreateArgs, GraphArgs, ServeArgs, ShortsCommands};
use super::config::ShortsConfig;
use super::pipeline::{JobRequest, JobSource, Pipeline};
use super::providers::Providers;
use super::render::graph::CaptionFiles;
use super::render::services::resolve_engine;
use super::render::{
    AudioTrack, RenderOrchestrator, StagedInputs, SystemEngineRunner, build_graph, compile_command,
};
use super::server;
use super::slides::{ImageAsset, ImageOrigin, assign_durations};
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format};

pub async fn handle_shorts_command(command: ShortsCommands, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        ShortsCommands::Serve(args) => handle_serve(config, args).await,
        ShortsCommands::Create(args) => handle_create(config, args).await,
        ShortsCommands::Graph(args) => handle_graph(&config, args).await,
        ShortsCommands::Config => show_config(&config, config_path),
    }
}

fn load_config(path: Option<&Path>) -> Result<ShortsConfig> {
    let config = match path {
        Some(path) => ShortsConfig::load_from_path(path)?,
        None => ShortsConfig::load()?,
    };
    Ok(config.with_env_overrides())
}

fn build_pipeline(config: &ShortsConfig) -> Result<Pipeline> {
    let ffmpeg = resolve_engine(&config.engine.ffmpeg)?;
    emit(
        Level::Debug,
        "shorts.engine.resolved",
        &format!("Using ffmpeg at {}", ffmpeg.display()),
        None,
    );

    let runner = Arc::new(SystemEngineRunner::new(ffmpeg));
    let orchestrator = Arc::new(RenderOrchestrator::from_config(runner, config));
    let providers = Providers::from_config(&config.providers)?;

    Ok(Pipeline::new(
        providers,
        orchestrator,
        config.retry.into(),
        config.script.clone(),
    ))
}

async fn handle_serve(mut config: ShortsConfig, args: ServeArgs) -> Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    let pipeline = Arc::new(build_pipeline(&config)?);
    server::serve(&config.server, pipeline).await
}

async fn handle_create(config: ShortsConfig, args: CreateArgs) -> Result<()> {
    let source = match (&args.url, &args.script) {
        (_, Some(path)) => JobSource::Script(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading script {}", path.display()))?,
        ),
        (Some(url), None) => JobSource::Url(url.clone()),
        (None, None) => anyhow::bail!("Either --url or --script is required"),
    };

    let request = JobRequest {
        source,
        title: args.title.clone(),
        images: read_images(&args.images).await?,
    };

    let pipeline = build_pipeline(&config)?;
    let output = pipeline.run(request).await?;

    let video_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&output.title));
    tokio::fs::write(&video_path, &output.video)
        .await
        .with_context(|| format!("writing video to {}", video_path.display()))?;

    if args.keep_text {
        let script_path = video_path.with_extension("txt");
        let captions_path = video_path.with_extension("srt");
        tokio::fs::write(&script_path, &output.script)
            .await
            .with_context(|| format!("writing script to {}", script_path.display()))?;
        tokio::fs::write(&captions_path, &output.captions)
            .await
            .with_context(|| format!("writing captions to {}", captions_path.display()))?;
    }

    emit(
        Level::Success,
        "shorts.create.done",
        &format!("Wrote {} ({} bytes)", video_path.display(), output.video.len()),
        Some(json!({
            "job": output.job_id,
            "path": video_path.display().to_string(),
            "bytes": output.video.len(),
        })),
    );
    Ok(())
}

async fn handle_graph(config: &ShortsConfig, args: GraphArgs) -> Result<()> {
    let transcript = match &args.captions {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading captions {}", path.display()))?,
        None => String::new(),
    };
    let captions: Captions = captions::build_captions(&transcript, &args.title)?;

    let duration = match args.duration {
        Some(duration) => duration,
        None => captions
            .body
            .end()
            .map(|end| end.as_secs_f64())
            .context("--duration is required when no captions are given")?,
    };

    let images: Vec<ImageAsset> = read_images(&args.images)
        .await?
        .into_iter()
        .enumerate()
        .map(|(ordinal, data)| ImageAsset::new(data, ordinal, ImageOrigin::User))
        .collect();
    let slides = assign_durations(images, duration);

    let audio_data = tokio::fs::read(&args.audio)
        .await
        .with_context(|| format!("reading audio {}", args.audio.display()))?;
    let audio = AudioTrack::new(Bytes::from(audio_data), duration);
    let graph = build_graph(&slides, &audio, &captions, &config.frame)?;

    let caption_dir = args
        .output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let staged = StagedInputs {
        slides: args.images.clone(),
        audio: args.audio.clone(),
        captions: CaptionFiles {
            title: caption_dir.join("title.srt"),
            body: args
                .captions
                .clone()
                .unwrap_or_else(|| caption_dir.join("body.srt")),
        },
        output: args.output.clone(),
    };
    let command = compile_command(&graph, &staged, &config.frame, &config.encoding)?;

    match get_output_format() {
        OutputFormat::Json => emit(
            Level::Info,
            "shorts.graph.command",
            "ffmpeg command",
            Some(json!({
                "binary": config.engine.ffmpeg,
                "args": command.args,
            })),
        ),
        OutputFormat::Text => {
            let line = shell_words::join(
                std::iter::once(config.engine.ffmpeg.as_str())
                    .chain(command.args.iter().map(String::as_str)),
            );
            emit(Level::Info, "shorts.graph.command", &line, None);
        }
    }
    Ok(())
}

fn show_config(config: &ShortsConfig, config_path: Option<&Path>) -> Result<()> {
    let mut shown = config.clone();
    for key in [
        &mut shown.providers.openai_api_key,
        &mut shown.providers.elevenlabs_api_key,
        &mut shown.providers.unsplash_access_key,
    ] {
        if key.is_some() {
            *key = Some("<redacted>".to_string());
        }
    }

    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => super::config::config_path()?,
    };
    let toml = toml::to_string_pretty(&shown).context("serializing config")?;
    emit(
        Level::Info,
        "shorts.config.show",
        &format!("# {}\n{}", path.display(), toml.trim_end()),
        None,
    );
    Ok(())
}

async fn read_images(paths: &[PathBuf]) -> Result<Vec<Bytes>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading image {}", path.display()))?;
        images.push(Bytes::from(data));
    }
    Ok(images)
}

fn default_output_path(title: &str) -> PathBuf {
    let stem: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        PathBuf::from("shorts.mp4")
    } else {
        PathBuf::from(format!("{stem}.mp4"))
    }
}
