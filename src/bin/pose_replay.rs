//! pose_replay - replay a landmark recording through the classification pipeline
//!
//! Reads JSON-lines frames from a file (or `-` for stdin), runs each one
//! through a single session in order, and writes one JSON result per line to
//! stdout. Progress and faults go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use pose_kernel::{ui, Delegate, LandmarkSource, PipelineConfig, Session};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a landmark recording through the pose pipeline")]
struct Args {
    /// JSON-lines landmark file, or `-` for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Pipeline config file (JSON, or TOML with a .toml extension)
    #[arg(long, env = "POSE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Per-frame pose classifier (ONNX path or stub://zero)
    #[arg(long, value_name = "SOURCE")]
    pose_model: Option<String>,

    /// Temporal classifier (ONNX path or stub://motion)
    #[arg(long, value_name = "SOURCE")]
    temporal_model: Option<String>,

    /// Label table for the pose classifier
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Frames per person window
    #[arg(long, value_name = "N")]
    sequence_length: Option<usize>,

    /// Temporal score strictly above this is positive
    #[arg(long, value_name = "SCORE")]
    threshold: Option<f32>,

    /// Compute delegate (cpu|gpu)
    #[arg(long, value_name = "DELEGATE")]
    delegate: Option<Delegate>,

    /// Only print results with a positive temporal verdict
    #[arg(long)]
    only_positive: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let config = {
        let _stage = ui.stage("Load configuration");
        resolve_config(&args)?
    };

    let mut session = {
        let _stage = ui.stage("Load models");
        Session::open(config).context("failed to open classification session")?
    };
    for fault in session.take_faults() {
        eprintln!("warning: {}", fault.message);
        if let Some(recommendation) = fault.recommendation {
            eprintln!("  {}", recommendation);
        }
    }

    let mut source = LandmarkSource::open(&args.input)?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut progress = ui.replay(&args.input);

    while let Some(frame) = source.next_frame()? {
        let result = session.process(&frame);
        progress.record(result.positive, result.rejected.len());
        if args.only_positive && !result.positive {
            continue;
        }
        serde_json::to_writer(&mut out, &result)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    progress.finish();
    Ok(())
}

fn resolve_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load_from(args.config.as_deref())?;
    if let Some(model) = &args.pose_model {
        config.models.pose_classifier = model.clone();
    }
    if let Some(model) = &args.temporal_model {
        config.models.temporal_classifier = model.clone();
    }
    if let Some(labels) = &args.labels {
        config.models.labels = labels.clone();
    }
    if let Some(length) = args.sequence_length {
        config.sequence_length = length;
    }
    if let Some(threshold) = args.threshold {
        config.decision_threshold = threshold;
    }
    if let Some(delegate) = args.delegate {
        config.delegate = delegate;
    }
    config.source.uri = args.input.clone();
    config.source.live = false;
    config.validate()?;
    Ok(config)
}
