use std::path::PathBuf;

use clap::Parser;

use autoshorts::shorts::{ShortsCommands, handle_shorts_command};
use autoshorts::ui::{self, prelude::*};

/// Turn news articles into narrated vertical short videos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit machine-readable JSON events
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: ShortsCommands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = handle_shorts_command(cli.command, cli.config.as_deref()).await {
        emit(Level::Error, "autoshorts.error", &format!("{err:#}"), None);
        std::process::exit(1);
    }
}
