use std::path::PathBuf;

use super::graph::{CaptionFiles, GraphInput, RenderGraph};
use super::util::format_seconds;
use crate::shorts::config::{EncodingConfig, FrameConfig};
use crate::shorts::error::{ShortsError, ShortsResult};

/// Paths of the files a graph's inputs were written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInputs {
    /// One file per slide, in slide order.
    pub slides: Vec<PathBuf>,
    pub audio: PathBuf,
    pub captions: CaptionFiles,
    pub output: PathBuf,
}

/// Full engine argument list, without the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn filter_complex(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == "-filter_complex")
            .and_then(|idx| self.args.get(idx + 1))
            .map(String::as_str)
    }
}

/// Turn a graph and its staged files into an engine invocation.
pub fn compile_command(
    graph: &RenderGraph,
    staged: &StagedInputs,
    frame: &FrameConfig,
    encoding: &EncodingConfig,
) -> ShortsResult<EngineCommand> {
    if staged.slides.len() != graph.slide_count() {
        return Err(ShortsError::InvalidGraph(format!(
            "graph expects {} slide files, {} were staged",
            graph.slide_count(),
            staged.slides.len()
        )));
    }

    let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into()];

    for input in graph.inputs() {
        match input {
            GraphInput::Still { slide, duration } => {
                let path = staged.slides.get(*slide).ok_or_else(|| {
                    ShortsError::InvalidGraph(format!("no staged file for slide {slide}"))
                })?;
                args.extend([
                    "-loop".into(),
                    "1".into(),
                    "-framerate".into(),
                    frame.fps.to_string(),
                    "-t".into(),
                    format_seconds(*duration),
                    "-i".into(),
                    path.to_string_lossy().into_owned(),
                ]);
            }
            GraphInput::Audio => {
                args.push("-i".into());
                args.push(staged.audio.to_string_lossy().into_owned());
            }
        }
    }

    args.push("-filter_complex".into());
    args.push(graph.to_filter_complex(&staged.captions));

    let output = graph.output();
    args.push("-map".into());
    args.push(format!("[{}]", output.video_label));
    args.push("-map".into());
    args.push(format!("{}:a", output.audio_input));

    encoding.push_to(frame.fps, &mut args);
    args.push(staged.output.to_string_lossy().into_owned());

    Ok(EngineCommand { args })
}

impl EncodingConfig {
    /// Append the fixed output codec options.
    pub fn push_to(&self, fps: u32, args: &mut Vec<String>) {
        args.extend([
            "-c:v".into(),
            self.video_codec.clone(),
            "-b:v".into(),
            self.video_bitrate.clone(),
            "-r".into(),
            fps.to_string(),
            "-pix_fmt".into(),
            self.pixel_format.clone(),
            "-c:a".into(),
            self.audio_codec.clone(),
            "-b:a".into(),
            self.audio_bitrate.clone(),
            "-movflags".into(),
            "+faststart".into(),
        ]);
    }
}
