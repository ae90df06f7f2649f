//! posed - pose classification daemon
//!
//! This daemon:
//! 1. Loads the pipeline configuration (file named by POSE_CONFIG, POSE_* overrides)
//! 2. Starts the pipeline worker, which owns the models
//! 3. Feeds frames from the configured landmark source, keep-latest for live
//!    sources and one-by-one for recordings
//! 4. Logs classification results and pipeline faults
//! 5. On Ctrl-C (or end of input) drains queued work and releases the models

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use pose_kernel::{
    ClassificationResult, LandmarkSource, PipelineConfig, PipelineEvent, PipelineWorker,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pose classification daemon")]
struct Args {
    /// Pipeline config file (JSON, or TOML with a .toml extension)
    #[arg(long, env = "POSE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pace live sources at this many frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = PipelineConfig::load_from(args.config.as_deref())?;
    let live = config.source.live;
    let delegate = config.delegate;
    let detector = config.detector;
    let mut source = LandmarkSource::open(&config.source.uri)?;

    log::info!(
        "posed {} starting: source={} delivery={} delegate={:?}",
        env!("CARGO_PKG_VERSION"),
        config.source.uri,
        if live { "keep-latest" } else { "batch" },
        delegate
    );
    log::info!(
        "detector settings: variant={:?} detection={:.1} tracking={:.1} presence={:.1}",
        detector.variant,
        detector.min_detection_confidence,
        detector.min_tracking_confidence,
        detector.min_presence_confidence
    );

    let (event_tx, event_rx) = mpsc::channel();
    let worker = PipelineWorker::spawn(config, event_tx)?;
    let presenter = std::thread::spawn(move || present(event_rx));

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("error setting Ctrl-C handler")?;

    let frame_interval = Duration::from_secs(1) / args.fps.max(1);
    let mut frames = 0u64;
    loop {
        if stop_rx.try_recv().is_ok() {
            log::info!("shutdown signal received, draining pipeline...");
            break;
        }
        if args.max_frames.is_some_and(|max| frames >= max) {
            break;
        }
        let started = Instant::now();
        let Some(frame) = source.next_frame()? else {
            log::info!("source exhausted after {} frames", frames);
            break;
        };
        frames += 1;

        if live {
            worker.submit_latest(frame)?;
            if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        } else {
            match worker.process_blocking(frame) {
                Ok(result) => log_result(&result),
                Err(err) => log::warn!("frame skipped: {:#}", err),
            }
        }
    }

    let dropped = worker.dropped_frames();
    worker.shutdown()?;
    let _ = presenter.join();

    let stats = source.stats();
    log::info!(
        "posed stopped: {} frames read from {}, {} superseded before processing",
        stats.frames_read,
        stats.uri,
        dropped
    );
    Ok(())
}

fn present(events: mpsc::Receiver<PipelineEvent>) {
    for event in events {
        match event {
            PipelineEvent::Result(result) => log_result(&result),
            PipelineEvent::Fault(fault) => {
                log::error!("pipeline fault: {}", fault.message);
                if let Some(recommendation) = fault.recommendation {
                    log::error!("recommendation: {}", recommendation);
                }
            }
        }
    }
}

fn log_result(result: &ClassificationResult) {
    for rejected in &result.rejected {
        log::warn!(
            "frame {}: rejected {}: {}",
            result.timestamp_ms,
            rejected.person,
            rejected.reason
        );
    }
    if result.positive {
        let persons: Vec<String> = result.positive_persons().map(|p| p.to_string()).collect();
        log::info!(
            "frame {}: activity detected for {} (rule={}, {}ms)",
            result.timestamp_ms,
            persons.join(", "),
            result.rule_pose,
            result.inference_time_ms
        );
    } else {
        log::debug!(
            "frame {}: {} persons, rule={}, {}ms",
            result.timestamp_ms,
            result.frame_labels.len(),
            result.rule_pose,
            result.inference_time_ms
        );
    }
}
