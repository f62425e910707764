use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use rvs::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_FPS, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH,
    DEFAULT_REDUNDANCY,
};
use rvs::{decode_file, encode_file, RvsConfig};

/// rvs — store arbitrary files inside lossless video for platforms that
/// only host video.
#[derive(Parser)]
#[command(name = "rvs", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into a video
    Encode {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output video path (.mkv)
        #[arg(short, long)]
        output: PathBuf,

        /// Encrypt the file with a password
        #[arg(short, long)]
        password: Option<String>,

        /// Chunk size in bytes (default: 4096)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u32,

        /// Fountain-code redundancy as a fraction (default: 0.30 = 30% extra packets)
        #[arg(long, default_value_t = DEFAULT_REDUNDANCY)]
        redundancy: f64,

        /// Frame width (default: 3840)
        #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
        width: u32,

        /// Frame height (default: 2160)
        #[arg(long, default_value_t = DEFAULT_FRAME_HEIGHT)]
        height: u32,

        /// Frames per second (default: 30)
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,
    },

    /// Decode a video back into the original file
    Decode {
        /// Input video path (.mkv)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Decryption password (required if the file was encrypted)
        #[arg(short, long)]
        password: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            password,
            chunk_size,
            redundancy,
            width,
            height,
            fps,
        } => {
            let cfg = RvsConfig {
                chunk_size,
                redundancy,
                width,
                height,
                fps,
            };

            encode_file(&input, &output, password.as_deref(), &cfg)?;
        }

        Commands::Decode {
            input,
            output,
            password,
        } => {
            decode_file(&input, &output, password.as_deref())?;
        }
    }

    Ok(())
}
