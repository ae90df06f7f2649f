//! Terminal reporting for the CLI binaries.
//!
//! Spinners go to stderr when it is a terminal and `--ui` allows it; otherwise
//! every stage is a plain `==>` line. Stdout is left alone for results.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    /// Report a named stage until the guard is dropped.
    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = spinner("{spinner} {msg}");
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Running frame counter for a replay.
    pub fn replay(&self, source: &str) -> ReplayProgress {
        let bar = self.use_pretty().then(|| {
            let bar = spinner("{spinner} {pos} frames {msg}");
            bar.set_message(format!("from {source}"));
            bar
        });
        if bar.is_none() {
            eprintln!("==> replaying {}", source);
        }
        ReplayProgress {
            bar,
            start: Instant::now(),
            frames: 0,
            positives: 0,
            rejected: 0,
        }
    }
}

fn spinner(template: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style =
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

/// Counts replayed frames; prints a summary line when finished.
pub struct ReplayProgress {
    bar: Option<ProgressBar>,
    start: Instant,
    frames: u64,
    positives: u64,
    rejected: u64,
}

impl ReplayProgress {
    pub fn record(&mut self, positive: bool, rejected: usize) {
        self.frames += 1;
        if positive {
            self.positives += 1;
        }
        self.rejected += rejected as u64;
        if let Some(bar) = &self.bar {
            bar.set_position(self.frames);
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn positives(&self) -> u64 {
        self.positives
    }

    pub fn summary(&self) -> String {
        format!(
            "{} frames, {} positive, {} rejected person frames ({})",
            self.frames,
            self.positives,
            self.rejected,
            format_duration(self.start.elapsed())
        )
    }

    pub fn finish(self) {
        let message = format!("✔ {}", self.summary());
        match &self.bar {
            Some(bar) => bar.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_output_needs_a_terminal() {
        assert!(!Ui::from_args(Some("pretty"), false, false).use_pretty());
        assert!(Ui::from_args(Some("pretty"), true, true).use_pretty());
        assert!(!Ui::from_args(Some("auto"), true, true).use_pretty());
        assert!(!Ui::from_args(Some("plain"), true, false).use_pretty());
    }

    #[test]
    fn replay_progress_counts_frames() {
        let ui = Ui::new(UiMode::Plain, false, true);
        let mut progress = ui.replay("mem");
        progress.record(false, 0);
        progress.record(true, 2);
        assert_eq!(progress.frames(), 2);
        assert_eq!(progress.positives(), 1);
        assert!(progress.summary().starts_with("2 frames, 1 positive, 2 rejected"));
        progress.finish();
    }
}
