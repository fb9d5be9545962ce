use std::path::PathBuf;
use std::process;

use clap::Parser;

use frameparity_core::pipeline::random_verify_use_case::{
    RandomVerifyUseCase, DEFAULT_FRAMES_PER_CHUNK,
};
use frameparity_core::pipeline::stream_verify_use_case::StreamVerifyUseCase;
use frameparity_core::verify::comparator::Tolerance;
use frameparity_core::video::domain::video_reader::VideoReader;
use frameparity_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use frameparity_core::video::infrastructure::keyframe_reader::KeyframeReader;

/// Cross-validates two video decode backends frame-by-frame.
#[derive(Parser)]
#[command(name = "frameparity")]
struct Cli {
    /// Verification scenario: stream or random.
    scenario: String,

    /// Path to the video data used for verification.
    #[arg(long)]
    data: PathBuf,

    /// Frames per chunk (defaults: 1 for stream, 3 for random).
    #[arg(long)]
    frames_per_chunk: Option<usize>,

    /// Seek timestamps in seconds, comma-separated (random only).
    #[arg(long, value_delimiter = ',')]
    timestamps: Option<Vec<f64>>,

    /// Implementation for backend B: precise or keyframe.
    #[arg(long, default_value = "keyframe")]
    backend: String,

    /// Root directory for diagnostic images (default: system temp).
    #[arg(long)]
    tmp_root: Option<PathBuf>,

    /// Absolute tolerance for sample equivalence.
    #[arg(long)]
    atol: Option<f64>,

    /// Relative tolerance for sample equivalence.
    #[arg(long)]
    rtol: Option<f64>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    // Backend A is always the frame-accurate reader; the flag picks
    // what it is verified against.
    let reader_a: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
    let reader_b = build_backend(&cli.backend)?;

    let mut tolerance = Tolerance::default();
    if let Some(atol) = cli.atol {
        tolerance.atol = atol;
    }
    if let Some(rtol) = cli.rtol {
        tolerance.rtol = rtol;
    }

    let tmp_root = cli
        .tmp_root
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("frameparity"));

    log::info!(
        "Verifying '{}' scenario on {} against backend '{}'",
        cli.scenario,
        cli.data.display(),
        cli.backend
    );
    log::debug!("diagnostics root: {}", tmp_root.display());

    match cli.scenario.as_str() {
        "stream" => {
            let mut use_case = StreamVerifyUseCase::new(
                reader_a,
                reader_b,
                cli.frames_per_chunk.unwrap_or(1),
                tolerance,
                tmp_root,
            );
            use_case.execute(&cli.data)?;
        }
        "random" => {
            let timestamps = cli.timestamps.clone().unwrap_or_default();
            let mut use_case = RandomVerifyUseCase::new(
                reader_a,
                reader_b,
                timestamps,
                cli.frames_per_chunk.unwrap_or(DEFAULT_FRAMES_PER_CHUNK),
                tolerance,
                tmp_root,
            );
            use_case.execute(&cli.data)?;
        }
        _ => unreachable!("scenario validated above"),
    }

    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.scenario.as_str() {
        "stream" => {
            if cli.timestamps.is_some() {
                return Err("--timestamps only applies to the random scenario".into());
            }
        }
        "random" => {
            if cli.timestamps.as_ref().map_or(true, |t| t.is_empty()) {
                return Err("--timestamps is required for the random scenario".into());
            }
        }
        other => {
            return Err(
                format!("Scenario must be 'stream' or 'random', got '{other}'").into(),
            )
        }
    }
    if cli.frames_per_chunk == Some(0) {
        return Err("--frames-per-chunk must be positive".into());
    }
    Ok(())
}

fn build_backend(name: &str) -> Result<Box<dyn VideoReader>, Box<dyn std::error::Error>> {
    match name {
        "precise" => Ok(Box::new(FfmpegReader::new())),
        "keyframe" => Ok(Box::new(KeyframeReader::new())),
        other => Err(format!("Backend must be 'precise' or 'keyframe', got '{other}'").into()),
    }
}
