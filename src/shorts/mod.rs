//! Article-to-shorts video pipeline.

pub mod captions;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod retry;
pub mod script;
pub mod server;
pub mod slides;

pub use cli::ShortsCommands;
pub use commands::handle_shorts_command;
pub use error::{ShortsError, ShortsResult};
pub use pipeline::{JobFailure, JobOutput, JobRequest, JobSource, Pipeline, Stage};
