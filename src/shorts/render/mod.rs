pub mod compiler;
pub mod graph;
pub mod orchestrator;
pub mod services;
pub mod util;
pub mod workspace;

use bytes::Bytes;

use super::captions::Captions;
use super::slides::Slide;

pub use compiler::{EngineCommand, StagedInputs, compile_command};
pub use graph::{CaptionFiles, RenderGraph, build_graph};
pub use orchestrator::RenderOrchestrator;
pub use services::{EngineRunner, SystemEngineRunner};
pub use workspace::Workspace;

/// Synthesized narration and its estimated length in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub data: Bytes,
    pub duration: f64,
}

impl AudioTrack {
    pub fn new(data: Bytes, duration: f64) -> Self {
        Self { data, duration }
    }
}

/// Everything the orchestrator needs to render one video.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub id: String,
    pub slides: Vec<Slide>,
    pub audio: AudioTrack,
    pub captions: Captions,
    pub graph: RenderGraph,
}
