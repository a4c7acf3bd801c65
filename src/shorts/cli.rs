use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum ShortsCommands {
    /// Run the HTTP job server
    Serve(ServeArgs),
    /// Produce one short from an article URL or a script file
    Create(CreateArgs),
    /// Print the ffmpeg command a job would run, without running it
    Graph(GraphArgs),
    /// Print the resolved configuration
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Article to turn into a short
    #[arg(long, value_hint = ValueHint::Url, conflicts_with = "script", required_unless_present = "script")]
    pub url: Option<String>,

    /// Text file with the narration to use as-is
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub script: Option<PathBuf>,

    /// Title burned in at the top of the video
    #[arg(short, long)]
    pub title: String,

    /// Image to use as a slide (repeatable, up to 6)
    #[arg(short, long = "image", value_hint = ValueHint::FilePath)]
    pub images: Vec<PathBuf>,

    /// Output video path; defaults to <title>.mp4 in the current directory
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Also write the script and body captions next to the video
    #[arg(long)]
    pub keep_text: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    /// Slide images, in order
    #[arg(short, long = "image", required = true, value_hint = ValueHint::FilePath)]
    pub images: Vec<PathBuf>,

    /// Narration audio file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub audio: PathBuf,

    /// Body captions as SRT
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub captions: Option<PathBuf>,

    /// Title caption text; the command reads it from title.srt beside the output
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Narration length in seconds; defaults to the end of the last caption
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Output path placed at the end of the command
    #[arg(short, long, default_value = "output.mp4", value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}
