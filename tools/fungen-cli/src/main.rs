//! FunGen CLI — Command-line interface for signal analysis and script generation.
//!
//! Usage:
//!   fungen recommend <CSV>       Analyze a prediction CSV and suggest parameters
//!   fungen postprocess <CSV>     Generate a funscript from a prediction CSV
//!   fungen info <FUNSCRIPT>      Show statistics for a generated script

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "fungen",
    about = "Video-to-funscript generation from per-frame prediction signals",
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
    /// Analyze a prediction CSV and recommend postprocessing parameters
    Recommend {
        /// Path to the prediction CSV (frame_index,timestamp_ms,predicted_change)
        csv: PathBuf,

        /// Print the extracted features as JSON
        #[arg(long)]
        features: bool,
    },

    /// Generate a funscript from a prediction CSV
    Postprocess {
        /// Path to the prediction CSV
        csv: PathBuf,

        /// Output script path (defaults to <csv stem>.funscript)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model name recorded in the script metadata
        #[arg(long, default_value = "unknown")]
        model_name: String,

        /// Derive parameters from the signal instead of using the flags below
        #[arg(long)]
        auto: bool,

        /// Smoothing window in frames
        #[arg(long, default_value = "7")]
        smooth_window: usize,

        /// Prominence threshold as a fraction of signal range
        #[arg(long, default_value = "0.15")]
        prominence_ratio: f64,

        /// Absolute prominence floor
        #[arg(long, default_value = "0.0075")]
        min_prominence: f64,

        /// Maximum position change per frame
        #[arg(long, default_value = "3.25")]
        max_slope: f64,

        /// Intermediate slope cap for boosted strokes
        #[arg(long, default_value = "2.25")]
        boost_slope: f64,

        /// Minimum position change per frame; slower segments are dropped
        #[arg(long, default_value = "2.25")]
        min_slope: f64,

        /// Merge extrema closer than this many milliseconds
        #[arg(long, default_value = "225.0")]
        merge_threshold_ms: f64,

        /// Disable FFT denoising
        #[arg(long)]
        no_fft_denoise: bool,

        /// Frames per retained FFT component
        #[arg(long, default_value = "10")]
        fft_frames_per_component: usize,

        /// FFT denoising window in frames
        #[arg(long, default_value = "120")]
        fft_window: usize,
    },

    /// Show statistics for a funscript
    Info {
        /// Path to the funscript
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from the app config; --verbose overrides.
    let config = fungen_common::AppConfig::load();
    let mut logging = config.logging;
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    fungen_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Recommend { csv, features } => commands::recommend::run(csv, features),
        Commands::Postprocess {
            csv,
            output,
            model_name,
            auto,
            smooth_window,
            prominence_ratio,
            min_prominence,
            max_slope,
            boost_slope,
            min_slope,
            merge_threshold_ms,
            no_fft_denoise,
            fft_frames_per_component,
            fft_window,
        } => commands::postprocess::run(commands::postprocess::Args {
            csv,
            output,
            model_name,
            auto,
            options: fungen_script_model::PostprocessOptions {
                smooth_window_frames: smooth_window,
                prominence_ratio,
                min_prominence,
                max_slope,
                boost_slope,
                min_slope,
                merge_threshold_ms,
                fft_denoise: !no_fft_denoise,
                fft_frames_per_component,
                fft_window_frames: fft_window,
            },
        }),
        Commands::Info { path } => commands::info::run(path),
    }
}
