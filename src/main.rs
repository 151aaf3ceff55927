// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "manual-camera")]
#[command(about = "Manual camera capture tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Show the capability snapshot for a camera
    Caps {
        /// Camera identifier (from 'manual-camera list')
        #[arg(short, long, default_value = "0")]
        camera: String,
    },

    /// Take a photo
    Photo {
        /// Camera identifier (from 'manual-camera list')
        #[arg(short, long)]
        camera: Option<String>,

        /// Capture raw sensor data instead of JPEG
        #[arg(long)]
        raw: bool,

        /// Enable manual exposure control
        #[arg(short, long)]
        manual: bool,

        /// ISO sensitivity (manual mode)
        #[arg(long)]
        iso: Option<i32>,

        /// Exposure time in nanoseconds (manual mode)
        #[arg(long)]
        shutter: Option<i64>,

        /// Focus distance in diopters (manual mode)
        #[arg(long)]
        focus: Option<f32>,

        /// Display rotation in degrees (0, 90, 180, 270)
        #[arg(long, default_value = "0")]
        rotation: i32,

        /// Output directory (default: configured or ~/Pictures)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=manual_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Caps { camera } => cli::show_capabilities(&camera),
        Commands::Photo {
            camera,
            raw,
            manual,
            iso,
            shutter,
            focus,
            rotation,
            output,
        } => cli::take_photo(cli::PhotoOptions {
            camera,
            raw,
            manual,
            iso,
            shutter_ns: shutter,
            focus,
            rotation,
            output,
        }),
    }
}
