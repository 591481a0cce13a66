// Skysong Music Generator: CLI entry point.
//
// Converts a cleaned weather CSV into a three-track MIDI file.
// The pipeline: load samples → (optionally) derive solar columns → render
// channels → write MIDI.
//
// Usage:
//   cargo run -p skysong_music --bin generate -- -i data_cleaned.csv
//     [-o out.mid] [--bpm N] [--duration SECONDS] [--auto-duration]
//     [--config skysong.toml] [--solar-table solar.csv] [--derive-solar]
//     [--tolerance MINUTES] [--no-realistic-timing] [--report report.json]
//     [-v]
//
// Flags override values from --config. Log level follows RUST_LOG, then -v
// (debug), then info.

use clap::Parser;
use skysong_music::config::SonifyConfig;
use skysong_music::ephemeris::annotate;
use skysong_music::source::{load_samples, load_solar_table};
use skysong_music::{Result, convert_with_report};
use std::path::{Path, PathBuf};
use tracing::error;

/// Command-line arguments for generate
#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "Convert a cleaned weather CSV to a 3-channel MIDI file with sunrise/sunset events")]
#[command(version)]
struct Args {
    /// Cleaned CSV file to convert
    #[arg(short, long = "input")]
    input: PathBuf,

    /// Output MIDI file (default: derived from the input name)
    #[arg(short, long = "output")]
    output: Option<PathBuf>,

    /// TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Beats per minute (60-240)
    #[arg(long)]
    bpm: Option<u32>,

    /// Duration in seconds (60-600)
    #[arg(long)]
    duration: Option<u32>,

    /// Derive the duration from the sample count to keep note density steady
    #[arg(long)]
    auto_duration: bool,

    /// Minutes either side of sunrise/sunset that count as an event
    #[arg(long)]
    tolerance: Option<u32>,

    /// Upper bound of the solar sine proxy
    #[arg(long)]
    sine_range: Option<f64>,

    /// Use the fixed 12:00 solar noon instead of the seasonal model
    #[arg(long)]
    no_realistic_timing: bool,

    /// CSV of measured sunrise/sunset times per date
    #[arg(long)]
    solar_table: Option<PathBuf>,

    /// Recompute solar_sine and the event flags from timestamps
    #[arg(long)]
    derive_solar: bool,

    /// Write run statistics as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(&args) {
        error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    config.validate()?;

    println!("=== Skysong Music Generator ===");
    println!("Input: {}", args.input.display());
    println!("Tempo: {} BPM", config.bpm);
    if config.auto_duration {
        println!("Duration: auto");
    } else {
        println!("Duration: {} s", config.duration_seconds);
    }
    println!();

    println!("[1/3] Loading samples...");
    let mut table = load_samples(&args.input, &config.columns)?;
    println!("  {} samples.", table.len());

    if args.derive_solar {
        let measured = match &args.solar_table {
            Some(path) => Some(load_solar_table(path)?),
            None => None,
        };
        let summary = annotate(&mut table, &config, measured.as_ref());
        println!(
            "  Derived solar columns over {} days ({} measured): {} sunrise, {} sunset samples.",
            summary.days, summary.measured_days, summary.sunrise_events, summary.sunset_events
        );
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, &config));
    println!("[2/3] Rendering and writing MIDI to {}...", output.display());
    let report = convert_with_report(&table, &config, &output, args.report.as_deref())?;
    println!(
        "  Done! {} s, {:.1} beats, {:.3} beats per sample.",
        report.duration_seconds, report.total_beats, report.beat_increment
    );
    for channel in &report.channels {
        println!(
            "  {}: {} notes (program {}, {})",
            channel.name, channel.notes, channel.program, channel.scale
        );
    }

    println!("[3/3] Summary");
    println!(
        "  Sunrise samples: {}, sunset samples: {}",
        report.sunrise_events, report.sunset_events
    );
    if let Some(rate) = report.notes_per_second() {
        println!("  Notes per second: {rate:.2}");
    }
    if let Some(path) = &args.report {
        println!("  Report: {}", path.display());
    }

    println!();
    println!("Play with: timidity {} (or any MIDI player)", output.display());
    Ok(())
}

/// Config file (if any) with CLI flags layered on top.
fn build_config(args: &Args) -> Result<SonifyConfig> {
    let mut config = match &args.config {
        Some(path) => SonifyConfig::load(path)?,
        None => SonifyConfig::default(),
    };
    if let Some(bpm) = args.bpm {
        config.bpm = bpm;
    }
    if let Some(duration) = args.duration {
        config.duration_seconds = duration;
    }
    if args.auto_duration {
        config.auto_duration = true;
    }
    if let Some(tolerance) = args.tolerance {
        config.tolerance_minutes = tolerance;
    }
    if let Some(range) = args.sine_range {
        config.sine_range = range;
    }
    if args.no_realistic_timing {
        config.use_realistic_timing = false;
    }
    Ok(config)
}

/// `<stem>_3ch_events_<bpm>bpm_<duration>s.mid`, or `..._auto.mid`.
fn default_output_path(input: &Path, config: &SonifyConfig) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = if config.auto_duration {
        format!("{stem}_3ch_events_{}bpm_auto.mid", config.bpm)
    } else {
        format!(
            "{stem}_3ch_events_{}bpm_{}s.mid",
            config.bpm, config.duration_seconds
        )
    };
    input.with_file_name(name)
}
