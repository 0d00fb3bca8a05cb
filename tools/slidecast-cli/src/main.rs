//! Slidecast CLI: command-line interface for previewing and exporting
//! slide timelines.
//!
//! Usage:
//!   slidecast export [OPTIONS]     Export a timeline to WebM
//!   slidecast frame --at <MS>      Render a single frame to PNG
//!   slidecast preview [OPTIONS]    Run headless playback
//!   slidecast info [OPTIONS]       Show timeline information
//!   slidecast check                Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slidecast_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "slidecast",
    about = "Turn slide timelines into WebM videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a timeline to a WebM video
    Export {
        /// Timeline JSON file (defaults to a single title slide)
        #[arg(short, long)]
        timeline: Option<PathBuf>,

        /// Output file path
        #[arg(short, long, default_value = "video.webm")]
        output: PathBuf,

        /// Output width (defaults to the configured width)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (defaults to the configured height)
        #[arg(long)]
        height: Option<u32>,

        /// Frames per second (defaults to the configured rate)
        #[arg(long)]
        fps: Option<u32>,

        /// Print progress as JSON lines instead of a progress bar
        #[arg(long)]
        json: bool,
    },

    /// Render the frame at a point in time to a PNG file
    Frame {
        /// Timeline JSON file (defaults to a single title slide)
        #[arg(short, long)]
        timeline: Option<PathBuf>,

        /// Time in milliseconds
        #[arg(long)]
        at: f64,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,
    },

    /// Play a timeline headlessly, logging slide changes
    Preview {
        /// Timeline JSON file (defaults to a single title slide)
        #[arg(short, long)]
        timeline: Option<PathBuf>,

        /// How long to play, in seconds
        #[arg(long, default_value = "5")]
        seconds: f64,
    },

    /// Show timeline information
    Info {
        /// Timeline JSON file (defaults to a single title slide)
        #[arg(short, long)]
        timeline: Option<PathBuf>,
    },

    /// Check system capabilities
    Check {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    slidecast_common::logging::init_logging(&logging);
    config.validate()?;

    match cli.command {
        Commands::Export {
            timeline,
            output,
            width,
            height,
            fps,
            json,
        } => commands::export::run(&config, timeline, output, width, height, fps, json).await,
        Commands::Frame {
            timeline,
            at,
            output,
        } => commands::frame::run(&config, timeline, at, output),
        Commands::Preview { timeline, seconds } => {
            commands::preview::run(&config, timeline, seconds).await
        }
        Commands::Info { timeline } => commands::info::run(&config, timeline),
        Commands::Check { save_config } => commands::check::run(&config, save_config),
    }
}
