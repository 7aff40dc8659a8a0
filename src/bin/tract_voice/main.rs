//! tract-voice - articulatory voice synthesizer
//!
//! Run with: cargo run -- render --out voice.wav
//!       or: cargo run -- play --seconds 5

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Render or play a synthetic voice
#[derive(Parser)]
#[command(name = "tract-voice")]
#[command(about = "Articulatory voice synthesis: glottal source through a waveguide vocal tract")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render offline to a WAV file
    Render {
        /// Output WAV path
        #[arg(short, long)]
        out: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value_t = 2.0)]
        seconds: f64,

        #[command(flatten)]
        voice: VoiceArgs,
    },
    /// Play through the default audio device
    Play {
        /// Duration in seconds
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f64,

        #[command(flatten)]
        voice: VoiceArgs,
    },
}

#[derive(clap::Args, Clone, Copy)]
pub struct VoiceArgs {
    /// Fundamental frequency in Hz
    #[arg(long, default_value_t = 140.0)]
    pub frequency: f64,

    /// Vocal fold tension, 0 (breathy) to 1 (pressed)
    #[arg(long, default_value_t = 0.6)]
    pub tenseness: f64,

    /// Open and close the lips at this rate (Hz) to babble
    #[arg(long)]
    pub flap: Option<f64>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { out, seconds, voice } => app::render(&out, seconds, voice),
        Commands::Play { seconds, voice } => app::play(seconds, voice),
    }
}
