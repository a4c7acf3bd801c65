//! Typed compositing graph.
//!
//! The graph is built from slides and caption tracks without touching the
//! filesystem; file paths only enter at [`RenderGraph::to_filter_complex`].

use std::fmt;
use std::path::PathBuf;

use super::AudioTrack;
use super::util::escape_ffmpeg_path;
use crate::shorts::captions::Captions;
use crate::shorts::config::FrameConfig;
use crate::shorts::error::{ShortsError, ShortsResult};
use crate::shorts::slides::Slide;

pub const TITLE_STYLE: &str = "FontName=Arial,FontSize=36,PrimaryColour=&HFFFFFF,OutlineColour=&H000000,Outline=2,Alignment=8,MarginV=40";
pub const BODY_STYLE: &str = "FontName=Arial,FontSize=24,PrimaryColour=&HFFFFFF,OutlineColour=&H000000,Outline=1,Alignment=2,MarginV=30";

pub const CONCAT_LABEL: &str = "concat_v";
pub const TITLED_LABEL: &str = "titled_v";
pub const CAPTIONED_LABEL: &str = "captioned_v";

/// One engine input, in `-i` order.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphInput {
    /// Looped still image shown for `duration` seconds.
    Still { slide: usize, duration: f64 },
    Audio,
}

/// A stream consumed by a filter node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRef {
    Video(usize),
    Label(String),
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRef::Video(index) => write!(f, "[{index}:v]"),
            StreamRef::Label(label) => write!(f, "[{label}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionLayer {
    Title,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    /// Scale into the frame keeping aspect ratio, pad to fill, square pixels.
    FitFrame { width: u32, height: u32 },
    /// Video-only concatenation of `segments` inputs.
    Concat { segments: usize },
    /// Burn one caption track into the stream.
    BurnSubtitles {
        layer: CaptionLayer,
        style: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterNode {
    pub inputs: Vec<StreamRef>,
    pub op: FilterOp,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMapping {
    pub video_label: String,
    pub audio_input: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderGraph {
    inputs: Vec<GraphInput>,
    nodes: Vec<FilterNode>,
    output: OutputMapping,
}

/// Caption files a graph refers to once staged on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionFiles {
    pub title: PathBuf,
    pub body: PathBuf,
}

impl CaptionFiles {
    fn path_for(&self, layer: CaptionLayer) -> &PathBuf {
        match layer {
            CaptionLayer::Title => &self.title,
            CaptionLayer::Body => &self.body,
        }
    }
}

/// Compile slides and caption tracks into a render graph.
///
/// Labels depend only on slide positions, so equal inputs give equal graphs.
pub fn build_graph(
    slides: &[Slide],
    audio: &AudioTrack,
    captions: &Captions,
    frame: &FrameConfig,
) -> ShortsResult<RenderGraph> {
    if slides.is_empty() {
        return Err(ShortsError::InvalidGraph("no slides to render".to_string()));
    }
    if audio.data.is_empty() {
        return Err(ShortsError::InvalidGraph("narration audio is empty".to_string()));
    }
    if frame.width == 0 || frame.height == 0 {
        return Err(ShortsError::InvalidGraph(format!(
            "invalid frame size {}x{}",
            frame.width, frame.height
        )));
    }
    if let Some((index, slide)) = slides
        .iter()
        .enumerate()
        .find(|(_, slide)| !slide.duration.is_finite() || slide.duration <= 0.0)
    {
        return Err(ShortsError::InvalidGraph(format!(
            "slide {index} has invalid duration {}",
            slide.duration
        )));
    }

    let mut inputs: Vec<GraphInput> = slides
        .iter()
        .enumerate()
        .map(|(slide, s)| GraphInput::Still {
            slide,
            duration: s.duration,
        })
        .collect();
    let audio_input = inputs.len();
    inputs.push(GraphInput::Audio);

    let mut nodes: Vec<FilterNode> = (0..slides.len())
        .map(|index| FilterNode {
            inputs: vec![StreamRef::Video(index)],
            op: FilterOp::FitFrame {
                width: frame.width,
                height: frame.height,
            },
            output: slide_label(index),
        })
        .collect();

    nodes.push(FilterNode {
        inputs: (0..slides.len())
            .map(|index| StreamRef::Label(slide_label(index)))
            .collect(),
        op: FilterOp::Concat {
            segments: slides.len(),
        },
        output: CONCAT_LABEL.to_string(),
    });

    let mut current = CONCAT_LABEL.to_string();
    let layers = [
        (CaptionLayer::Title, &captions.title, TITLE_STYLE, TITLED_LABEL),
        (CaptionLayer::Body, &captions.body, BODY_STYLE, CAPTIONED_LABEL),
    ];
    for (layer, track, style, label) in layers {
        if track.is_empty() {
            continue;
        }
        nodes.push(FilterNode {
            inputs: vec![StreamRef::Label(current)],
            op: FilterOp::BurnSubtitles { layer, style },
            output: label.to_string(),
        });
        current = label.to_string();
    }

    Ok(RenderGraph {
        inputs,
        nodes,
        output: OutputMapping {
            video_label: current,
            audio_input,
        },
    })
}

fn slide_label(index: usize) -> String {
    format!("s{index}")
}

impl RenderGraph {
    pub fn inputs(&self) -> &[GraphInput] {
        &self.inputs
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn output(&self) -> &OutputMapping {
        &self.output
    }

    pub fn slide_count(&self) -> usize {
        self.inputs
            .iter()
            .filter(|input| matches!(input, GraphInput::Still { .. }))
            .count()
    }

    /// Caption layers that are burned in, in burn order.
    pub fn caption_layers(&self) -> Vec<CaptionLayer> {
        self.nodes
            .iter()
            .filter_map(|node| match node.op {
                FilterOp::BurnSubtitles { layer, .. } => Some(layer),
                _ => None,
            })
            .collect()
    }

    /// Serialize to `-filter_complex` text.
    pub fn to_filter_complex(&self, captions: &CaptionFiles) -> String {
        self.nodes
            .iter()
            .map(|node| render_node(node, captions))
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn render_node(node: &FilterNode, captions: &CaptionFiles) -> String {
    let inputs: String = node.inputs.iter().map(ToString::to_string).collect();
    let filter = match &node.op {
        FilterOp::FitFrame { width, height } => format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1"
        ),
        FilterOp::Concat { segments } => format!("concat=n={segments}:v=1:a=0"),
        FilterOp::BurnSubtitles { layer, style } => format!(
            "subtitles='{path}':force_style='{style}'",
            path = escape_ffmpeg_path(captions.path_for(*layer))
        ),
    };
    format!("{inputs}{filter}[{output}]", output = node.output)
}
